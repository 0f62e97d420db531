use tracing::{info, warn, error, debug};
use tracing_subscriber::EnvFilter;
use std::time::Instant;

pub struct Logger;

impl Logger {
    /// Install the global subscriber. `RUST_LOG` takes precedence over `verbose`.
    pub fn init(verbose: bool) {
        let default_filter = if verbose { "hostpack=debug" } else { "hostpack=info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        // A second init (tests, embedding) is not an error
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

    pub fn build_start(profile: &str, units: usize) {
        info!("🔨 hostpack - {} build", profile);
        info!("═══════════════════════════════════════");
        info!("📦 Deployment units: {}", units);
    }

    pub fn phase(name: &str) {
        debug!("▶ Phase: {}", name);
    }

    pub fn bundling(name: &str, entry: &str) {
        debug!("📦 Bundling {} ({})", name, entry);
    }

    pub fn transformed(name: &str, dependencies: usize, exports: usize) {
        debug!(
            "🔁 Wrapped {}: {} dependencies, {} exports",
            name, dependencies, exports
        );
    }

    pub fn build_complete(units: usize, total_bytes: usize, build_time: std::time::Duration) {
        info!("");
        info!("📊 Build Statistics:");
        info!("  • Units built: {}", units);
        info!("  • Total size: {} bytes", total_bytes);
        info!("  • Build time: {:.2?}", build_time);
        info!("✅ Build completed successfully!");
    }

    pub fn info(msg: &str) {
        info!("{}", msg);
    }

    pub fn debug(msg: &str) {
        debug!("{}", msg);
    }

    pub fn error(msg: &str) {
        error!("❌ {}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
