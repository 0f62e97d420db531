use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};

/// One buildable deployment unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDescriptor {
    #[serde(default)]
    pub name: String,
    /// Host entry-point kind (e.g. "restlet", "suitelet")
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "exports")]
    pub logical_exports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_alias_exports: Option<Vec<String>>,
    #[serde(default, alias = "entry")]
    pub source_entry_path: PathBuf,
    #[serde(default, alias = "outdir")]
    pub output_directory: PathBuf,
}

impl DeploymentDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        logical_exports: &[&str],
        source_entry_path: impl Into<PathBuf>,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            logical_exports: logical_exports.iter().map(|s| s.to_string()).collect(),
            host_alias_exports: None,
            source_entry_path: source_entry_path.into(),
            output_directory: output_directory.into(),
        }
    }

    pub fn with_host_aliases(mut self, aliases: &[&str]) -> Self {
        self.host_alias_exports = Some(aliases.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Path of the artifact this descriptor owns
    pub fn artifact_path(&self) -> PathBuf {
        self.output_directory.join(format!("{}.js", self.name))
    }

    /// Host alias declared for the export at `index`, if any
    pub fn host_alias(&self, index: usize) -> Option<&str> {
        self.host_alias_exports
            .as_ref()
            .and_then(|aliases| aliases.get(index))
            .map(String::as_str)
    }

    /// Resolve relative paths against a base directory
    pub fn rebased(mut self, base: &Path) -> Self {
        if self.source_entry_path.is_relative() {
            self.source_entry_path = base.join(&self.source_entry_path);
        }
        if self.output_directory.is_relative() {
            self.output_directory = base.join(&self.output_directory);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Development,
    Production,
}

impl ProfileKind {
    /// Parse the values accepted by `HOSTPACK_PROFILE`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "dev" | "development" => Some(ProfileKind::Development),
            "prod" | "production" => Some(ProfileKind::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Development => "development",
            ProfileKind::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    Off,
    External,
    Inline,
}

/// Shared bundler options, built once per process
#[derive(Debug, Clone, PartialEq)]
pub struct BuildProfile {
    pub kind: ProfileKind,
    pub syntax_target: String,
    pub minify: bool,
    pub source_maps: SourceMapMode,
    pub preserve_names: bool,
    /// Patterns excluded from bundling; the host provides them at load time
    pub external_capabilities: Vec<String>,
}

impl BuildProfile {
    pub fn development() -> Self {
        Self {
            kind: ProfileKind::Development,
            syntax_target: "es2021".to_string(),
            minify: false,
            source_maps: SourceMapMode::Inline,
            preserve_names: true,
            external_capabilities: vec!["N/*".to_string()],
        }
    }

    pub fn production() -> Self {
        Self {
            kind: ProfileKind::Production,
            syntax_target: "es2021".to_string(),
            minify: true,
            source_maps: SourceMapMode::Off,
            preserve_names: true,
            external_capabilities: vec!["N/*".to_string()],
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Development => Self::development(),
            ProfileKind::Production => Self::production(),
        }
    }
}

/// Size thresholds used by bundle analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisThresholds {
    pub warning_bytes: usize,
    pub error_bytes: usize,
    pub large_total_bytes: usize,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            warning_bytes: 100 * 1024,
            error_bytes: 500 * 1024,
            large_total_bytes: 1024 * 1024,
        }
    }
}

/// Flat-export output of the bundler for one descriptor
#[derive(Debug, Clone)]
pub struct BundledArtifact {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

impl BundledArtifact {
    pub fn size_bytes(&self) -> usize {
        self.text.len()
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Ordered, duplicate-free external capability paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    paths: Vec<String>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping first-seen order; returns false for duplicates
    pub fn insert(&mut self, path: &str) -> bool {
        if self.paths.iter().any(|p| p == path) {
            return false;
        }
        self.paths.push(path.to_string());
        true
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Parameter names, positionally matching `paths()`
    pub fn parameter_names(&self) -> Vec<String> {
        self.paths.iter().map(|p| capability_parameter_name(p)).collect()
    }
}

impl FromIterator<String> for DependencySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = DependencySet::new();
        for path in iter {
            set.insert(&path);
        }
        set
    }
}

/// Last path segment of a capability, made into a valid identifier.
/// `platform/logging` → `logging`, `N/ui/serverWidget` → `serverWidget`
pub fn capability_parameter_name(path: &str) -> String {
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path);

    let mut name: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBinding {
    pub logical_name: String,
    pub resolved_symbol: String,
}

/// Factory-wrapped artifact ready for deployment
#[derive(Debug, Clone)]
pub struct TransformedArtifact {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
    pub dependencies: DependencySet,
    pub bindings: Vec<ExportBinding>,
}

impl TransformedArtifact {
    pub fn size_bytes(&self) -> usize {
        self.text.len()
    }
}

/// Step of one build cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    Validating,
    Bundling,
    Transforming,
    Analyzing,
    Reporting,
    Done,
    Failed,
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuildPhase::Validating => "validate",
            BuildPhase::Bundling => "bundle",
            BuildPhase::Transforming => "transform",
            BuildPhase::Analyzing => "analyze",
            BuildPhase::Reporting => "report",
            BuildPhase::Done => "done",
            BuildPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
