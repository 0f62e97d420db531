use crate::core::{interfaces::Bundler, models::*};
use crate::utils::{Result, HostpackError, Logger};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Invokes the esbuild executable once per deployment descriptor
pub struct EsbuildBundler {
    executable: PathBuf,
}

impl EsbuildBundler {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Prefer the project-local install, fall back to `esbuild` on PATH
    pub fn locate(root: &Path) -> Self {
        let local = root.join("node_modules").join(".bin").join(if cfg!(windows) {
            "esbuild.cmd"
        } else {
            "esbuild"
        });

        if local.is_file() {
            Self::new(local)
        } else {
            Self::new("esbuild")
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command-line arguments for one descriptor under `profile`
    pub fn build_args(descriptor: &DeploymentDescriptor, profile: &BuildProfile) -> Vec<String> {
        let mut args = vec![
            descriptor.source_entry_path.to_string_lossy().to_string(),
            "--bundle".to_string(),
            "--format=cjs".to_string(),
            "--platform=neutral".to_string(),
            format!("--target={}", profile.syntax_target),
            format!("--outfile={}", descriptor.artifact_path().display()),
            "--log-level=warning".to_string(),
        ];

        for external in &profile.external_capabilities {
            args.push(format!("--external:{}", external));
        }

        // Identifier minification would defeat export resolution
        if profile.minify {
            args.push("--minify-whitespace".to_string());
        }
        if profile.preserve_names {
            args.push("--keep-names".to_string());
        }

        match profile.source_maps {
            SourceMapMode::Off => {}
            SourceMapMode::External => args.push("--sourcemap".to_string()),
            SourceMapMode::Inline => args.push("--sourcemap=inline".to_string()),
        }

        args
    }
}

#[async_trait::async_trait]
impl Bundler for EsbuildBundler {
    async fn bundle(&self, descriptor: &DeploymentDescriptor, profile: &BuildProfile) -> Result<BundledArtifact> {
        let args = Self::build_args(descriptor, profile);
        Logger::bundling(&descriptor.name, &descriptor.source_entry_path.display().to_string());

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                HostpackError::bundle(
                    &descriptor.name,
                    &descriptor.source_entry_path,
                    format!("failed to run {}: {}", self.executable.display(), e),
                )
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(HostpackError::bundle(
                &descriptor.name,
                &descriptor.source_entry_path,
                format!("{} exited with {}\n{}", self.name(), output.status, stderr.trim_end()),
            ));
        }
        if !stderr.trim().is_empty() {
            Logger::warn(&format!("{}: {}", descriptor.name, stderr.trim_end()));
        }

        let path = descriptor.artifact_path();
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            HostpackError::bundle(
                &descriptor.name,
                &descriptor.source_entry_path,
                format!("bundle output {} unreadable: {}", path.display(), e),
            )
        })?;

        Ok(BundledArtifact {
            name: descriptor.name.clone(),
            path,
            text,
        })
    }

    fn name(&self) -> &str {
        "esbuild"
    }
}
