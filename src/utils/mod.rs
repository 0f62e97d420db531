// Shared utilities module
pub mod errors;
pub mod logging;
pub mod bundle_analysis;
pub mod config_loader;
pub mod watch;

pub use errors::*;
pub use logging::*;
pub use bundle_analysis::*;
pub use config_loader::*;
pub use watch::*;
