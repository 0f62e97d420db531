use crate::core::models::{AnalysisThresholds, BuildProfile, DeploymentDescriptor, ProfileKind, SourceMapMode};
use crate::core::registry::DescriptorRegistry;
use crate::infrastructure::processors::TransformOptions;
use crate::utils::{Logger, HostpackError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "hostpack.config.json";
pub const PROFILE_ENV: &str = "HOSTPACK_PROFILE";
pub const ANALYZE_ENV: &str = "HOSTPACK_ANALYZE";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Configuration file format (hostpack.config.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Deployment descriptor table
    #[serde(default)]
    pub deployments: Vec<DeploymentDescriptor>,

    /// Bundler executable (default: node_modules/.bin/esbuild, then PATH)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundler: Option<String>,

    /// Target syntax level (default: "es2021")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syntax_target: Option<String>,

    /// Modules the host provides at load time (default: ["N/*"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_capabilities: Option<Vec<String>>,

    /// Profile overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_maps: Option<SourceMapMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_names: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<AnalysisThresholds>,

    /// Paths observed in watch mode (default: ["src"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_paths: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,

    /// Where to persist the JSON build report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,

    /// External clean step, as an argv list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_command: Option<Vec<String>>,

    /// Wrapper callee (default: "factory")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory_callee: Option<String>,
}

/// Process-level settings read once at entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub profile: Option<ProfileKind>,
    pub force_analysis: bool,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let profile = lookup(PROFILE_ENV).and_then(|value| {
            let parsed = ProfileKind::parse(&value);
            if parsed.is_none() {
                Logger::warn(&format!("Ignoring unknown {}={}", PROFILE_ENV, value));
            }
            parsed
        });

        let force_analysis = lookup(ANALYZE_ENV)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Self {
            profile,
            force_analysis,
        }
    }
}

/// Immutable configuration built once and passed by reference
#[derive(Debug, Clone)]
pub struct HostpackConfig {
    pub root: PathBuf,
    pub registry: DescriptorRegistry,
    pub profile: BuildProfile,
    pub thresholds: AnalysisThresholds,
    pub bundler_executable: Option<PathBuf>,
    pub watch_paths: Vec<PathBuf>,
    pub debounce: Duration,
    pub report_file: Option<PathBuf>,
    pub clean_command: Option<Vec<String>>,
    pub transform: TransformOptions,
}

impl HostpackConfig {
    /// Output directories of every descriptor
    pub fn output_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .registry
            .descriptors()
            .iter()
            .map(|d| d.output_directory.clone())
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }
}

/// Config loader: config file + profile selection
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_file(path: &Path) -> Result<ConfigFile> {
        if !path.is_file() {
            return Err(HostpackError::config(
                "<config>",
                format!("config file not found: {}", path.display()),
            ));
        }

        Logger::debug(&format!("Loading config from {}", path.display()));

        let content = std::fs::read_to_string(path)?;
        let config: ConfigFile = serde_json::from_str(&content).map_err(|e| {
            HostpackError::config("<config>", format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// Merge the file with the selected profile. Relative paths resolve
    /// against `root` (the config file's directory).
    pub fn resolve(file: ConfigFile, root: &Path, kind: ProfileKind) -> HostpackConfig {
        let mut profile = BuildProfile::for_kind(kind);
        if let Some(target) = file.syntax_target {
            profile.syntax_target = target;
        }
        if let Some(externals) = file.external_capabilities {
            profile.external_capabilities = externals;
        }
        if let Some(minify) = file.minify {
            profile.minify = minify;
        }
        if let Some(source_maps) = file.source_maps {
            profile.source_maps = source_maps;
        }
        if let Some(preserve_names) = file.preserve_names {
            profile.preserve_names = preserve_names;
        }

        let descriptors = file
            .deployments
            .into_iter()
            .map(|d| d.rebased(root))
            .collect();

        let watch_paths = file
            .watch_paths
            .unwrap_or_else(|| vec!["src".to_string()])
            .into_iter()
            .map(|p| Self::rebase(root, &p))
            .collect();

        HostpackConfig {
            root: root.to_path_buf(),
            registry: DescriptorRegistry::new(descriptors),
            profile,
            thresholds: file.thresholds.unwrap_or_default(),
            bundler_executable: file.bundler.map(|b| {
                // Bare names are looked up on PATH
                if b.contains('/') || b.contains('\\') {
                    Self::rebase(root, &b)
                } else {
                    PathBuf::from(b)
                }
            }),
            watch_paths,
            debounce: Duration::from_millis(file.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
            report_file: file.report_file.map(|p| Self::rebase(root, &p)),
            clean_command: file.clean_command.filter(|argv| !argv.is_empty()),
            transform: TransformOptions {
                factory_callee: file
                    .factory_callee
                    .unwrap_or_else(|| TransformOptions::default().factory_callee),
            },
        }
    }

    fn rebase(root: &Path, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    /// Generate example config file
    pub fn generate_example() -> String {
        let example = ConfigFile {
            deployments: vec![DeploymentDescriptor::new(
                "orders_restlet",
                "restlet",
                &["get", "post"],
                "src/restlets/orders.ts",
                "dist/restlets",
            )],
            external_capabilities: Some(vec!["N/*".to_string()]),
            report_file: Some("dist/build-report.json".to_string()),
            ..Default::default()
        };
        serde_json::to_string_pretty(&example).unwrap_or_default()
    }
}
