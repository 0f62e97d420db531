// Bundle analysis for hostpack
// Size classification, aggregate recommendations and the persisted build report

use crate::core::models::{AnalysisThresholds, TransformedArtifact};
use crate::utils::{Result, Logger};
use std::path::{Path, PathBuf};
use serde::Serialize;

/// Size classification of one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeLevel {
    Clean,
    Warning,
    Error,
}

/// Structured note attached to the report; never fails the build
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWarning {
    pub artifact: String,
    pub level: SizeLevel,
    pub message: String,
}

/// Input for analysis of one artifact
#[derive(Debug, Clone)]
pub struct ArtifactInput {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
    pub export_count: usize,
}

impl From<&TransformedArtifact> for ArtifactInput {
    fn from(artifact: &TransformedArtifact) -> Self {
        Self {
            name: artifact.name.clone(),
            path: artifact.path.clone(),
            text: artifact.text.clone(),
            export_count: artifact.bindings.len(),
        }
    }
}

/// Statistics for a single artifact
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStats {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: usize,
    pub size_kb: f64,
    pub line_count: usize,
    pub export_count: usize,
    pub level: SizeLevel,
    pub warnings: Vec<AnalysisWarning>,
}

/// Complete bundle analysis results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleAnalysis {
    pub total_size: usize,
    /// Sorted by size, descending
    pub artifacts: Vec<ArtifactStats>,
    pub recommendations: Vec<String>,
}

/// Classify a size against the thresholds. Reaching a threshold counts as crossing it.
pub fn classify(size_bytes: usize, thresholds: &AnalysisThresholds) -> SizeLevel {
    if size_bytes >= thresholds.error_bytes {
        SizeLevel::Error
    } else if size_bytes >= thresholds.warning_bytes {
        SizeLevel::Warning
    } else {
        SizeLevel::Clean
    }
}

impl BundleAnalysis {
    pub fn analyze(inputs: &[ArtifactInput], thresholds: &AnalysisThresholds) -> Self {
        let mut artifacts: Vec<ArtifactStats> = inputs
            .iter()
            .map(|input| {
                let size_bytes = input.text.len();
                let level = classify(size_bytes, thresholds);
                let warnings = match level {
                    SizeLevel::Clean => Vec::new(),
                    SizeLevel::Warning => vec![AnalysisWarning {
                        artifact: input.name.clone(),
                        level,
                        message: format!(
                            "{} is {} (warning threshold {})",
                            input.name,
                            Self::format_size(size_bytes),
                            Self::format_size(thresholds.warning_bytes)
                        ),
                    }],
                    SizeLevel::Error => vec![AnalysisWarning {
                        artifact: input.name.clone(),
                        level,
                        message: format!(
                            "{} is {} (error threshold {})",
                            input.name,
                            Self::format_size(size_bytes),
                            Self::format_size(thresholds.error_bytes)
                        ),
                    }],
                };

                ArtifactStats {
                    name: input.name.clone(),
                    path: input.path.clone(),
                    size_bytes,
                    size_kb: size_bytes as f64 / 1024.0,
                    line_count: input.text.lines().count(),
                    export_count: input.export_count,
                    level,
                    warnings,
                }
            })
            .collect();

        let total_size: usize = artifacts.iter().map(|a| a.size_bytes).sum();

        // Sort by size descending
        artifacts.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

        let mut recommendations = Vec::new();
        for artifact in artifacts.iter().filter(|a| a.level == SizeLevel::Error) {
            recommendations.push(format!(
                "Split {} into smaller deployment units or move shared code out of the entry",
                artifact.name
            ));
        }
        if total_size > thresholds.large_total_bytes {
            recommendations.push(format!(
                "Total bundle size {} exceeds {}: review for shared-dependency duplication across units",
                Self::format_size(total_size),
                Self::format_size(thresholds.large_total_bytes)
            ));
        }

        Self {
            total_size,
            artifacts,
            recommendations,
        }
    }

    /// Every warning attached to any artifact
    pub fn warnings(&self) -> impl Iterator<Item = &AnalysisWarning> {
        self.artifacts.iter().flat_map(|a| a.warnings.iter())
    }

    /// Attach a warning (e.g. a syntax diagnostic) to a named artifact
    pub fn attach_warning(&mut self, warning: AnalysisWarning) {
        if let Some(stats) = self.artifacts.iter_mut().find(|a| a.name == warning.artifact) {
            stats.warnings.push(warning);
        }
    }

    /// Generate a human-readable report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push('\n');
        report.push_str("╔════════════════════════════════════════════════════════════╗\n");
        report.push_str("║              📊 BUNDLE ANALYSIS REPORT                     ║\n");
        report.push_str("╚════════════════════════════════════════════════════════════╝\n");
        report.push('\n');

        report.push_str("📦 OVERVIEW\n");
        report.push_str("─────────────────────────────────────────────────────────────\n");
        report.push_str(&format!("  Total Size:      {}\n", Self::format_size(self.total_size)));
        report.push_str(&format!("  Artifacts:       {}\n", self.artifacts.len()));
        report.push('\n');

        report.push_str("📂 ARTIFACTS\n");
        report.push_str("─────────────────────────────────────────────────────────────\n");
        for artifact in &self.artifacts {
            let percentage = if self.total_size > 0 {
                (artifact.size_bytes as f64 / self.total_size as f64) * 100.0
            } else {
                0.0
            };
            let marker = match artifact.level {
                SizeLevel::Clean => "✅",
                SizeLevel::Warning => "⚠️ ",
                SizeLevel::Error => "❌",
            };
            report.push_str(&format!(
                "  {} {:24} {:>10} {:>6} lines {:>3} exports {}\n",
                marker,
                Self::truncate(&artifact.name, 24),
                Self::format_size(artifact.size_bytes),
                artifact.line_count,
                artifact.export_count,
                Self::create_bar(percentage, 20)
            ));
        }
        report.push('\n');

        if !self.recommendations.is_empty() {
            report.push_str("💡 RECOMMENDATIONS\n");
            report.push_str("─────────────────────────────────────────────────────────────\n");
            for recommendation in &self.recommendations {
                report.push_str(&format!("  • {}\n", recommendation));
            }
            report.push('\n');
        }

        report
    }

    /// Format bytes as human-readable size
    pub fn format_size(bytes: usize) -> String {
        const KB: f64 = 1024.0;
        const MB: f64 = KB * 1024.0;

        if bytes == 0 {
            "0 B".to_string()
        } else if bytes < KB as usize {
            format!("{} B", bytes)
        } else if bytes < MB as usize {
            format!("{:.2} KB", bytes as f64 / KB)
        } else {
            format!("{:.2} MB", bytes as f64 / MB)
        }
    }

    fn create_bar(percentage: f64, width: usize) -> String {
        let filled = (((percentage / 100.0) * width as f64) as usize).min(width);
        let empty = width.saturating_sub(filled);
        format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
    }

    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            format!("{:width$}", s, width = max_len)
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }
}

/// Per-artifact entry of the persisted build report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub name: String,
    pub size_bytes: usize,
    pub warnings: Vec<String>,
}

/// Summary of one build cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub timestamp: String,
    pub build_duration_ms: u128,
    pub per_artifact: Vec<ReportEntry>,
    pub total_size_bytes: usize,
    pub success: bool,
    pub recommendations: Vec<String>,
}

impl BuildReport {
    pub fn from_analysis(analysis: &BundleAnalysis, build_duration: std::time::Duration, success: bool) -> Self {
        let per_artifact = analysis
            .artifacts
            .iter()
            .map(|a| ReportEntry {
                name: a.name.clone(),
                size_bytes: a.size_bytes,
                warnings: a.warnings.iter().map(|w| w.message.clone()).collect(),
            })
            .collect();

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            build_duration_ms: build_duration.as_millis(),
            per_artifact,
            total_size_bytes: analysis.total_size,
            success,
            recommendations: analysis.recommendations.clone(),
        }
    }

    /// Report for a cycle that aborted before analysis
    pub fn failed(build_duration: std::time::Duration) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            build_duration_ms: build_duration.as_millis(),
            per_artifact: Vec::new(),
            total_size_bytes: 0,
            success: false,
            recommendations: Vec::new(),
        }
    }

    /// Save the report as pretty JSON, replacing any previous one
    pub async fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// Display bundle analysis to console
pub fn display_analysis(analysis: &BundleAnalysis) {
    Logger::info(&analysis.generate_report());
    for warning in analysis.warnings() {
        match warning.level {
            SizeLevel::Error => Logger::error(&warning.message),
            _ => Logger::warn(&warning.message),
        }
    }
}
