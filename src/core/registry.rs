// Deployment descriptor registry
// Static table of deployment units, validated before every build

use crate::core::models::DeploymentDescriptor;
use crate::utils::{Result, HostpackError, Logger};
use std::collections::HashSet;

/// Read-only table of deployment descriptors
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    descriptors: Vec<DeploymentDescriptor>,
}

impl DescriptorRegistry {
    pub fn new(descriptors: Vec<DeploymentDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[DeploymentDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&DeploymentDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Validate every descriptor, rejecting duplicate names
    pub async fn validate_all(&self) -> Result<()> {
        if self.descriptors.is_empty() {
            return Err(HostpackError::config("<registry>", "no deployments configured"));
        }

        let mut seen = HashSet::new();
        for descriptor in &self.descriptors {
            if !descriptor.name.is_empty() && !seen.insert(descriptor.name.as_str()) {
                return Err(HostpackError::config(
                    &descriptor.name,
                    "duplicate descriptor name",
                ));
            }
            validate(descriptor).await?;
        }

        Logger::debug(&format!("Validated {} deployment descriptors", self.descriptors.len()));
        Ok(())
    }
}

/// Check one descriptor's required fields and source entry; creates the
/// output directory when missing.
pub async fn validate(descriptor: &DeploymentDescriptor) -> Result<()> {
    let label = if descriptor.name.is_empty() {
        "<unnamed>"
    } else {
        descriptor.name.as_str()
    };

    let missing = |field: &str| HostpackError::config(label, format!("missing required field '{}'", field));

    if descriptor.name.trim().is_empty() {
        return Err(missing("name"));
    }
    if descriptor.category.trim().is_empty() {
        return Err(missing("category"));
    }
    if descriptor.logical_exports.is_empty() {
        return Err(missing("logicalExports"));
    }
    if descriptor.source_entry_path.as_os_str().is_empty() {
        return Err(missing("sourceEntryPath"));
    }
    if descriptor.output_directory.as_os_str().is_empty() {
        return Err(missing("outputDirectory"));
    }

    if let Some(blank) = descriptor.logical_exports.iter().find(|e| !is_identifier(e)) {
        return Err(HostpackError::config(
            label,
            format!("invalid logical export name '{}'", blank),
        ));
    }

    if let Some(aliases) = &descriptor.host_alias_exports {
        if aliases.len() != descriptor.logical_exports.len() {
            return Err(HostpackError::config(
                label,
                format!(
                    "hostAliasExports has {} entries but logicalExports has {}",
                    aliases.len(),
                    descriptor.logical_exports.len()
                ),
            ));
        }
    }

    match tokio::fs::metadata(&descriptor.source_entry_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            return Err(HostpackError::config(
                label,
                format!(
                    "sourceEntryPath does not exist: {}",
                    descriptor.source_entry_path.display()
                ),
            ));
        }
    }

    if !descriptor.output_directory.exists() {
        Logger::debug(&format!("Creating output directory {}", descriptor.output_directory.display()));
        tokio::fs::create_dir_all(&descriptor.output_directory).await?;
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
