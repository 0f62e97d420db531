use crate::core::{interfaces::*, models::*};
use crate::infrastructure::processors::{
    extract_dependencies, extract_header, resolve_bindings, verify_syntax, FormatTransformer,
};
use crate::utils::{
    display_analysis, AnalysisWarning, ArtifactInput, BuildReport, BundleAnalysis, HostpackConfig, HostpackError,
    Logger, Result, SizeLevel, Timer,
};
use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Per-invocation switches for one build cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Print the full analysis report after the build
    pub show_analysis: bool,
}

/// Everything a successful cycle produced
#[derive(Debug)]
pub struct BuildOutcome {
    pub artifacts: Vec<TransformedArtifact>,
    pub analysis: BundleAnalysis,
    pub report: BuildReport,
    /// Phases entered, in order
    pub phases: Vec<BuildPhase>,
}

/// Records phase transitions of one cycle
struct PhaseTracker {
    phases: Vec<BuildPhase>,
}

impl PhaseTracker {
    fn new() -> Self {
        Self { phases: Vec::new() }
    }

    fn enter(&mut self, phase: BuildPhase) {
        Logger::phase(&phase.to_string());
        self.phases.push(phase);
    }

    fn fail(&mut self, err: &HostpackError) {
        self.phases.push(BuildPhase::Failed);
        match err.descriptor() {
            Some(name) => Logger::error(&format!("Build failed in {} phase ({}): {}", err.phase(), name, err)),
            None => Logger::error(&format!("Build failed in {} phase: {}", err.phase(), err)),
        }
    }
}

/// Sequences validate → bundle → transform → analyze → report
pub struct BuildOrchestrator {
    bundler: Arc<dyn Bundler>,
    fs_service: Arc<dyn FileSystemService>,
    transformer: FormatTransformer,
}

impl BuildOrchestrator {
    pub fn new(
        bundler: Arc<dyn Bundler>,
        fs_service: Arc<dyn FileSystemService>,
        transformer: FormatTransformer,
    ) -> Self {
        Self {
            bundler,
            fs_service,
            transformer,
        }
    }

    /// Run one full build cycle. Any descriptor failure aborts the cycle.
    pub async fn build(&self, config: &HostpackConfig, options: BuildOptions) -> Result<BuildOutcome> {
        let start = Instant::now();
        let mut tracker = PhaseTracker::new();
        match self.run_cycle(config, options, &mut tracker).await {
            Ok(mut outcome) => {
                tracker.enter(BuildPhase::Done);
                outcome.phases = tracker.phases;
                Ok(outcome)
            }
            Err(err) => {
                tracker.fail(&err);
                // A previous cycle's report must not outlive this failure
                if let Some(report_file) = &config.report_file {
                    if let Err(save_err) = BuildReport::failed(start.elapsed()).save_json(report_file).await {
                        Logger::warn(&format!("Could not write failure report: {}", save_err));
                    }
                }
                Err(err)
            }
        }
    }

    async fn run_cycle(
        &self,
        config: &HostpackConfig,
        options: BuildOptions,
        tracker: &mut PhaseTracker,
    ) -> Result<BuildOutcome> {
        let start = Instant::now();
        let descriptors = config.registry.descriptors();
        Logger::build_start(config.profile.kind.as_str(), descriptors.len());

        tracker.enter(BuildPhase::Validating);
        config.registry.validate_all().await?;

        tracker.enter(BuildPhase::Bundling);
        let bundled = self.bundle_all(descriptors, &config.profile).await?;
        for artifact in &bundled {
            Logger::debug(&format!(
                "{}: bundled {} bytes, {} lines",
                artifact.name,
                artifact.size_bytes(),
                artifact.line_count()
            ));
        }

        // Every bundle has completed before any transformation starts
        tracker.enter(BuildPhase::Transforming);
        let mut artifacts = Vec::with_capacity(bundled.len());
        let mut extra_warnings = Vec::new();
        for (descriptor, artifact) in descriptors.iter().zip(bundled.iter()) {
            let (transformed, warnings) = self.transform_one(descriptor, artifact).await?;
            artifacts.push(transformed);
            extra_warnings.extend(warnings);
        }

        tracker.enter(BuildPhase::Analyzing);
        let inputs: Vec<ArtifactInput> = artifacts.iter().map(ArtifactInput::from).collect();
        let mut analysis = BundleAnalysis::analyze(&inputs, &config.thresholds);
        for warning in extra_warnings {
            analysis.attach_warning(warning);
        }

        tracker.enter(BuildPhase::Reporting);
        let report = BuildReport::from_analysis(&analysis, start.elapsed(), true);
        if let Some(report_file) = &config.report_file {
            report.save_json(report_file).await?;
            Logger::debug(&format!("Build report written to {}", report_file.display()));
        }

        if options.show_analysis {
            display_analysis(&analysis);
        } else {
            for warning in analysis.warnings() {
                Logger::warn(&warning.message);
            }
        }

        Logger::build_complete(artifacts.len(), analysis.total_size, start.elapsed());

        Ok(BuildOutcome {
            artifacts,
            analysis,
            report,
            phases: Vec::new(),
        })
    }

    /// Bundle all descriptors concurrently; the first failure drops the rest
    async fn bundle_all(
        &self,
        descriptors: &[DeploymentDescriptor],
        profile: &BuildProfile,
    ) -> Result<Vec<BundledArtifact>> {
        let _timer = Timer::start("Bundling");

        let tasks = descriptors.iter().map(|descriptor| async move {
            self.bundler.bundle(descriptor, profile).await.map_err(|err| {
                if err.descriptor().is_some() {
                    err
                } else {
                    HostpackError::bundle(&descriptor.name, &descriptor.source_entry_path, err.to_string())
                }
            })
        });

        try_join_all(tasks).await
    }

    async fn transform_one(
        &self,
        descriptor: &DeploymentDescriptor,
        artifact: &BundledArtifact,
    ) -> Result<(TransformedArtifact, Vec<AnalysisWarning>)> {
        let _timer = Timer::start(&format!("Transforming {}", descriptor.name));
        let mut warnings = Vec::new();

        let dependencies = extract_dependencies(&artifact.text);
        let bindings = resolve_bindings(&artifact.text, descriptor);

        let header = match self.fs_service.read_file(&descriptor.source_entry_path).await {
            Ok(source) => extract_header(&source),
            Err(e) => {
                Logger::warn(&format!("{}: header not copied: {}", descriptor.name, e));
                String::new()
            }
        };

        let parameter_names = dependencies.parameter_names();
        let mut seen = HashSet::new();
        for (path, parameter) in dependencies.paths().iter().zip(parameter_names.iter()) {
            if !seen.insert(parameter.as_str()) {
                warnings.push(AnalysisWarning {
                    artifact: descriptor.name.clone(),
                    level: SizeLevel::Warning,
                    message: format!(
                        "{}: capability {} shares parameter name '{}' with an earlier dependency",
                        descriptor.name, path, parameter
                    ),
                });
            }
        }

        let transformed = self
            .transformer
            .transform(descriptor, &artifact.text, &dependencies, &bindings, &header);

        for diagnostic in verify_syntax(&transformed.text) {
            warnings.push(AnalysisWarning {
                artifact: descriptor.name.clone(),
                level: SizeLevel::Warning,
                message: format!("{}: wrapped output does not parse: {}", descriptor.name, diagnostic),
            });
        }

        self.fs_service
            .write_file_atomic(&transformed.path, &transformed.text)
            .await
            .map_err(|err| match err {
                HostpackError::Io(io) => HostpackError::transform(&descriptor.name, &transformed.path, io),
                other => other,
            })?;

        Logger::transformed(&descriptor.name, dependencies.len(), bindings.len());
        Logger::debug(&format!(
            "{}: {} -> {} bytes after wrapping",
            descriptor.name,
            artifact.size_bytes(),
            transformed.size_bytes()
        ));
        Ok((transformed, warnings))
    }

    /// Analyze artifacts already on disk without building
    pub async fn analyze_existing(&self, config: &HostpackConfig, options: BuildOptions) -> Result<BundleAnalysis> {
        let mut inputs = Vec::new();
        for descriptor in config.registry.descriptors() {
            let path = descriptor.artifact_path();
            if !self.fs_service.file_exists(&path) {
                Logger::warn(&format!("{}: no artifact at {}", descriptor.name, path.display()));
                continue;
            }
            let text = self.fs_service.read_file(&path).await?;
            inputs.push(ArtifactInput {
                name: descriptor.name.clone(),
                path,
                text,
                export_count: descriptor.logical_exports.len(),
            });
        }

        let analysis = BundleAnalysis::analyze(&inputs, &config.thresholds);
        if options.show_analysis {
            display_analysis(&analysis);
        }
        Ok(analysis)
    }

    /// Run the configured clean command, or remove owned artifacts
    pub async fn clean(&self, config: &HostpackConfig) -> Result<()> {
        if let Some(argv) = &config.clean_command {
            let Some((program, args)) = argv.split_first() else {
                return Err(HostpackError::config("<clean>", "cleanCommand is empty"));
            };
            Logger::info(&format!("🧹 Running clean step: {}", argv.join(" ")));
            let status = tokio::process::Command::new(program)
                .args(args)
                .current_dir(&config.root)
                .status()
                .await?;
            if !status.success() {
                return Err(HostpackError::Io(std::io::Error::other(format!(
                    "clean step '{}' exited with {}",
                    argv.join(" "),
                    status
                ))));
            }
            return Ok(());
        }

        for descriptor in config.registry.descriptors() {
            let path = descriptor.artifact_path();
            self.fs_service.remove_file(&path).await?;
            self.fs_service
                .remove_file(&path.with_extension("js.map"))
                .await?;
        }
        Logger::info("🧹 Removed previous artifacts");
        Ok(())
    }
}
