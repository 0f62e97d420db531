// Watch mode for hostpack
// Coalesces bursts of file changes into single rebuild triggers

use crate::utils::{Result, Logger, HostpackError};
use notify::{Watcher, RecursiveMode, Event, EventKind, RecommendedWatcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::Instant;

/// Configuration for watch mode
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Paths to watch for changes
    pub watch_paths: Vec<PathBuf>,
    /// Quiet period before a burst of changes triggers a rebuild
    pub debounce: Duration,
    /// Directories whose changes never trigger (build outputs)
    pub ignored_dirs: Vec<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watch_paths: vec![PathBuf::from("src")],
            debounce: Duration::from_millis(300),
            ignored_dirs: Vec::new(),
        }
    }
}

/// What the observation backend reports
#[derive(Debug, Clone, PartialEq)]
pub enum WatchSignal {
    Changed(PathBuf),
    BackendFailed(String),
}

/// Observes paths and re-runs a callback after each debounced burst
pub struct WatchController {
    config: WatchConfig,
}

impl WatchController {
    pub fn new(config: WatchConfig) -> Self {
        Self { config }
    }

    /// Observe the configured paths until `shutdown` resolves.
    ///
    /// Errors returned by `on_change` are logged and observation continues;
    /// a failing backend ends the session with `WatchObservation`.
    pub async fn watch<F, Fut, S>(&self, on_change: F, shutdown: S) -> Result<()>
    where
        F: FnMut(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
        S: Future<Output = ()>,
    {
        let (tx, rx) = unbounded_channel();
        let ignored_dirs = self.config.ignored_dirs.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if should_ignore_event(&event) {
                        return;
                    }
                    for path in event.paths {
                        if is_relevant_path(&path, &ignored_dirs) {
                            let _ = tx.send(WatchSignal::Changed(path));
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchSignal::BackendFailed(e.to_string()));
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| HostpackError::WatchObservation(format!("Failed to create watcher: {}", e)))?;

        let mut watched = 0;
        for path in &self.config.watch_paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(|e| HostpackError::WatchObservation(format!("Failed to watch {}: {}", path.display(), e)))?;
                watched += 1;
            } else {
                Logger::warn(&format!("Watch path does not exist: {}", path.display()));
            }
        }
        if watched == 0 {
            return Err(HostpackError::WatchObservation(
                "none of the configured watch paths exist".to_string(),
            ));
        }

        Logger::info("👀 Watch mode started - monitoring for changes...");
        Logger::info(&format!(
            "   Watching: {}",
            self.config
                .watch_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        Logger::info("   Press Ctrl+C to stop");

        let result = self.run_events(rx, on_change, shutdown).await;

        // Release the OS watch handles before returning to the caller
        drop(watcher);
        result
    }

    /// Debounce loop over an event stream
    pub async fn run_events<F, Fut, S>(
        &self,
        mut rx: UnboundedReceiver<WatchSignal>,
        mut on_change: F,
        shutdown: S,
    ) -> Result<()>
    where
        F: FnMut(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let debounce = self.config.debounce;
        let timer = tokio::time::sleep(debounce);
        tokio::pin!(timer);
        let mut pending: Option<PathBuf> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    Logger::info("👋 Stopping watch mode...");
                    return Ok(());
                }
                signal = rx.recv() => match signal {
                    Some(WatchSignal::Changed(path)) => {
                        Logger::debug(&format!("Changed: {}", path.display()));
                        pending = Some(path);
                        timer.as_mut().reset(Instant::now() + debounce);
                    }
                    Some(WatchSignal::BackendFailed(message)) => {
                        let err = HostpackError::WatchObservation(message);
                        Logger::error(&err.to_string());
                        return Err(err);
                    }
                    None => {
                        Logger::warn("Watch channel disconnected");
                        return Ok(());
                    }
                },
                _ = &mut timer, if pending.is_some() => {
                    if let Some(path) = pending.take() {
                        Self::trigger_rebuild(path, &mut on_change).await;
                    }
                }
            }
        }
    }

    async fn trigger_rebuild<F, Fut>(path: PathBuf, on_change: &mut F)
    where
        F: FnMut(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        Logger::info(&format!("🔄 Rebuilding... ({} changed)", path.display()));
        let start = std::time::Instant::now();

        match on_change(path).await {
            Ok(()) => {
                Logger::info(&format!("✅ Rebuild complete in {}ms", start.elapsed().as_millis()));
            }
            Err(e) => {
                let err = HostpackError::rebuild(e);
                Logger::error(&err.format_detailed());
                Logger::info("👀 Still watching for changes...");
            }
        }
    }
}

/// Check if event should be ignored
fn should_ignore_event(event: &Event) -> bool {
    // Ignore metadata-only changes
    matches!(event.kind, EventKind::Access(_) | EventKind::Other)
}

/// Check if a changed path may trigger a rebuild
pub fn is_relevant_path(path: &Path, ignored_dirs: &[PathBuf]) -> bool {
    if ignored_dirs.iter().any(|dir| path.starts_with(dir)) {
        return false;
    }

    let path_str = path.to_string_lossy();
    !(path.components().any(|c| {
        let part = c.as_os_str();
        part == ".git" || part == "node_modules"
    }) || path_str.ends_with('~')
        || path_str.ends_with(".swp")
        || path_str.ends_with(".tmp")
        || path_str.ends_with(".hostpack-tmp"))
}
