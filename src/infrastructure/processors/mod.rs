// Processors module
pub mod dependency_extractor;
pub mod export_resolver;
pub mod format_transformer;

pub use dependency_extractor::*;
pub use export_resolver::*;
pub use format_transformer::*;
