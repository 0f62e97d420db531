/// Discovers which external platform capabilities a bundled artifact references.
///
/// The bundler leaves excluded externals as `require("<path>")` calls, usually
/// wrapped by an interop helper (`__toESM(require("N/log"))`). The helper name
/// is not stable between builds, so matching is done on the call's argument
/// shape rather than the helper identifier.

use crate::core::models::DependencySet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `helper(require("path"))`, `helper(require("path"), 1)` or bare `require("path")`
pub static EXTERNAL_REFERENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:[A-Za-z_$][\w$]*\(\s*require\(\s*["']([^"']+)["']\s*\)(?:\s*,\s*\d+)?\s*\))|(?:\brequire\(\s*["']([^"']+)["']\s*\))"#,
    )
    .expect("external reference pattern is valid")
});

/// Capability path captured by either alternative of the reference pattern
pub fn captured_path<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Scan artifact text for external references; first-seen order, de-duplicated.
pub fn extract_dependencies(artifact_text: &str) -> DependencySet {
    let mut dependencies = DependencySet::new();

    for caps in EXTERNAL_REFERENCE_REGEX.captures_iter(artifact_text) {
        if let Some(path) = captured_path(&caps) {
            dependencies.insert(path);
        }
    }

    dependencies
}
