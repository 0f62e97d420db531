use crate::core::{interfaces::Bundler, models::ProfileKind, services::*};
use crate::infrastructure::{EsbuildBundler, FormatTransformer, TokioFileSystemService};
use crate::utils::{
    ConfigLoader, EnvOverrides, HostpackConfig, HostpackError, Logger, WatchConfig, WatchController,
};
use anyhow::Context;
use clap::{CommandFactory, Parser};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "hostpack")]
#[command(about = "Bundle deployment units and wrap them for the hosting runtime")]
#[command(version)]
pub struct Cli {
    /// Use the development build profile
    #[arg(long, overrides_with = "prod")]
    pub dev: bool,
    /// Use the production build profile
    #[arg(long, overrides_with = "dev")]
    pub prod: bool,
    /// Rebuild whenever watched sources change
    #[arg(long)]
    pub watch: bool,
    /// Run the clean step before building
    #[arg(long)]
    pub clean: bool,
    /// Print bundle analysis (standalone when no build flag is given)
    #[arg(long = "analyze-bundles")]
    pub analyze_bundles: bool,
    /// Validate deployment descriptors and exit
    #[arg(long = "validate-only")]
    pub validate_only: bool,
    /// Path to the config file
    #[arg(short, long, default_value = crate::utils::CONFIG_FILE_NAME)]
    pub config: PathBuf,
    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Profile chosen on the command line; the last of --dev/--prod wins
    pub fn profile_kind(&self) -> Option<ProfileKind> {
        if self.prod {
            Some(ProfileKind::Production)
        } else if self.dev {
            Some(ProfileKind::Development)
        } else {
            None
        }
    }

    fn has_build_flags(&self) -> bool {
        self.dev || self.prod || self.watch || self.clean
    }
}

/// Separate arguments the CLI recognizes from unknown ones
pub fn split_known_args(args: Vec<String>) -> (Vec<String>, Vec<String>) {
    let command = Cli::command();
    let mut longs: HashSet<String> = ["help", "version"].iter().map(|s| s.to_string()).collect();
    let mut shorts: HashSet<char> = ['h', 'V'].into_iter().collect();
    let mut value_longs = HashSet::new();
    let mut value_shorts = HashSet::new();

    for arg in command.get_arguments() {
        let takes_value = arg.get_action().takes_values();
        if let Some(long) = arg.get_long() {
            longs.insert(long.to_string());
            if takes_value {
                value_longs.insert(long.to_string());
            }
        }
        if let Some(short) = arg.get_short() {
            shorts.insert(short);
            if takes_value {
                value_shorts.insert(short);
            }
        }
    }

    let mut known = Vec::new();
    let mut unknown = Vec::new();
    let mut iter = args.into_iter();

    if let Some(program) = iter.next() {
        known.push(program);
    }

    while let Some(token) = iter.next() {
        if let Some(long) = token.strip_prefix("--") {
            let name = long.split('=').next().unwrap_or_default();
            if longs.contains(name) {
                let needs_value = value_longs.contains(name) && !long.contains('=');
                known.push(token);
                if needs_value {
                    if let Some(value) = iter.next() {
                        known.push(value);
                    }
                }
            } else {
                unknown.push(token);
            }
        } else if token.len() > 1 && token.starts_with('-') {
            let short = token.chars().nth(1).unwrap_or('-');
            if shorts.contains(&short) {
                let needs_value = value_shorts.contains(&short) && token.chars().count() == 2;
                known.push(token);
                if needs_value {
                    if let Some(value) = iter.next() {
                        known.push(value);
                    }
                }
            } else {
                unknown.push(token);
            }
        } else {
            unknown.push(token);
        }
    }

    (known, unknown)
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, args: Vec<String>) -> anyhow::Result<ExitCode> {
        let (known, unknown) = split_known_args(args);

        let cli = match Cli::try_parse_from(&known) {
            Ok(cli) => cli,
            Err(e) => {
                let code = if e.use_stderr() { ExitCode::from(2) } else { ExitCode::SUCCESS };
                e.print()?;
                return Ok(code);
            }
        };

        Logger::init(cli.verbose);
        for arg in &unknown {
            Logger::warn(&format!("Ignoring unknown argument '{}'", arg));
        }

        let env = EnvOverrides::from_env();
        let kind = cli
            .profile_kind()
            .or(env.profile)
            .unwrap_or(ProfileKind::Production);

        let config = Self::load_config(&cli.config, kind)?;

        match self.dispatch(&cli, &env, &config).await {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => {
                Logger::error(&e.format_detailed());
                Ok(ExitCode::FAILURE)
            }
        }
    }

    fn load_config(path: &Path, kind: ProfileKind) -> anyhow::Result<HostpackConfig> {
        if !path.is_file() {
            Logger::info(&format!(
                "No {} found. Example configuration:\n{}",
                path.display(),
                ConfigLoader::generate_example()
            ));
        }
        let file = ConfigLoader::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;

        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().context("resolving working directory")?,
        };
        let root = std::fs::canonicalize(&root).unwrap_or(root);

        Ok(ConfigLoader::resolve(file, &root, kind))
    }

    fn orchestrator(config: &HostpackConfig) -> BuildOrchestrator {
        let bundler: Arc<dyn Bundler> = match &config.bundler_executable {
            Some(executable) => Arc::new(EsbuildBundler::new(executable)),
            None => Arc::new(EsbuildBundler::locate(&config.root)),
        };

        BuildOrchestrator::new(
            bundler,
            Arc::new(TokioFileSystemService),
            FormatTransformer::new(config.transform.clone()),
        )
    }

    async fn dispatch(&self, cli: &Cli, env: &EnvOverrides, config: &HostpackConfig) -> crate::utils::Result<()> {
        if cli.validate_only {
            config.registry.validate_all().await?;
            Logger::info(&format!("✅ {} deployment descriptors are valid", config.registry.len()));
            return Ok(());
        }

        let orchestrator = Self::orchestrator(config);
        let options = BuildOptions {
            show_analysis: cli.analyze_bundles || env.force_analysis,
        };

        if cli.analyze_bundles && !cli.has_build_flags() {
            orchestrator.analyze_existing(config, options).await?;
            return Ok(());
        }

        if cli.clean {
            orchestrator.clean(config).await?;
        }

        if cli.watch {
            return self.handle_watch(&orchestrator, config, options).await;
        }

        orchestrator.build(config, options).await?;
        Ok(())
    }

    async fn handle_watch(
        &self,
        orchestrator: &BuildOrchestrator,
        config: &HostpackConfig,
        options: BuildOptions,
    ) -> crate::utils::Result<()> {
        let options = BuildOptions { show_analysis: true, ..options };

        Logger::info("🔨 Initial build...");
        if let Err(e) = orchestrator.build(config, options).await {
            Logger::error(&HostpackError::rebuild(e).format_detailed());
        }

        let controller = WatchController::new(WatchConfig {
            watch_paths: config.watch_paths.clone(),
            debounce: config.debounce,
            ignored_dirs: config.output_directories(),
        });

        controller
            .watch(
                move |_changed| async move { orchestrator.build(config, options).await.map(|_| ()) },
                async {
                    let _ = tokio::signal::ctrl_c().await;
                },
            )
            .await
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
