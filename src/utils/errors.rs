use crate::core::models::BuildPhase;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostpackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in '{descriptor}': {message}")]
    Config { descriptor: String, message: String },

    #[error("Bundle error in '{descriptor}' ({phase}): {message}")]
    Bundle {
        descriptor: String,
        source_path: PathBuf,
        phase: BuildPhase,
        message: String,
    },

    #[error("Failed to write transformed artifact for '{descriptor}' to {}: {source}", .path.display())]
    Transform {
        descriptor: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File watching failed: {0}")]
    WatchObservation(String),

    #[error("Rebuild failed: {0}")]
    Rebuild(Box<HostpackError>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostpackError {
    /// Configuration error for a named descriptor (or the config file itself)
    pub fn config(descriptor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            descriptor: descriptor.into(),
            message: message.into(),
        }
    }

    pub fn bundle(
        descriptor: impl Into<String>,
        source_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::Bundle {
            descriptor: descriptor.into(),
            source_path: source_path.into(),
            phase: BuildPhase::Bundling,
            message: message.into(),
        }
    }

    pub fn transform(descriptor: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Transform {
            descriptor: descriptor.into(),
            path: path.into(),
            source,
        }
    }

    /// Wrap an error raised inside a watch-triggered cycle
    pub fn rebuild(inner: HostpackError) -> Self {
        match inner {
            already @ HostpackError::Rebuild(_) => already,
            other => Self::Rebuild(Box::new(other)),
        }
    }

    /// Name of the descriptor that caused the failure, if any
    pub fn descriptor(&self) -> Option<&str> {
        match self {
            HostpackError::Config { descriptor, .. }
            | HostpackError::Bundle { descriptor, .. }
            | HostpackError::Transform { descriptor, .. } => Some(descriptor),
            HostpackError::Rebuild(inner) => inner.descriptor(),
            _ => None,
        }
    }

    /// Phase the failure belongs to
    pub fn phase(&self) -> BuildPhase {
        match self {
            HostpackError::Config { .. } => BuildPhase::Validating,
            HostpackError::Bundle { phase, .. } => *phase,
            HostpackError::Transform { .. } => BuildPhase::Transforming,
            HostpackError::Rebuild(inner) => inner.phase(),
            _ => BuildPhase::Failed,
        }
    }

    /// Format error with descriptor and phase context
    pub fn format_detailed(&self) -> String {
        match self {
            HostpackError::Bundle {
                descriptor,
                source_path,
                phase,
                message,
            } => {
                let mut output = format!("Bundle Error: {}", descriptor);
                output.push_str(&format!("\n📁 Source: {}", source_path.display()));
                output.push_str(&format!("\n🔖 Phase: {}", phase));
                output.push_str(&format!("\n📝 Output:\n{}", Self::indent(message)));
                output
            }
            HostpackError::Config { descriptor, message } => {
                format!("Config Error: {}\n📝 {}", descriptor, message)
            }
            HostpackError::Rebuild(inner) => inner.format_detailed(),
            _ => self.to_string(),
        }
    }

    fn indent(text: &str) -> String {
        text.lines()
            .map(|line| format!("    │ {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub type Result<T> = std::result::Result<T, HostpackError>;
