/// Maps logical export names to the symbols the bundler actually emitted.
///
/// The bundler may suffix renamed duplicates (`get` → `get2`). Any function
/// definition whose identifier contains the logical name counts; the last one
/// in output order wins, otherwise the logical name is assumed unchanged.

use crate::core::models::{DeploymentDescriptor, ExportBinding};
use regex::Regex;

fn find_last_definition(artifact_text: &str, needle: &str) -> Option<String> {
    if needle.is_empty() {
        return None;
    }

    let pattern = format!(
        r"\bfunction(?:\s*\*\s*|\s+)([\w$]*{}[\w$]*)\s*\(",
        regex::escape(needle)
    );
    // The needle is escaped, so the pattern always compiles
    let definition = Regex::new(&pattern).ok()?;

    definition
        .captures_iter(artifact_text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .last()
}

/// Resolve one logical export; never fails.
pub fn resolve_export(artifact_text: &str, logical_name: &str) -> String {
    find_last_definition(artifact_text, logical_name).unwrap_or_else(|| logical_name.to_string())
}

/// One binding per logical export, in declared order. A host alias is tried
/// when the logical name itself has no definition.
pub fn resolve_bindings(artifact_text: &str, descriptor: &DeploymentDescriptor) -> Vec<ExportBinding> {
    descriptor
        .logical_exports
        .iter()
        .enumerate()
        .map(|(index, logical_name)| {
            let resolved_symbol = find_last_definition(artifact_text, logical_name)
                .or_else(|| {
                    descriptor
                        .host_alias(index)
                        .and_then(|alias| find_last_definition(artifact_text, alias))
                })
                .unwrap_or_else(|| logical_name.clone());

            ExportBinding {
                logical_name: logical_name.clone(),
                resolved_symbol,
            }
        })
        .collect()
}
