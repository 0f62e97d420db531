// hostpack - bundles flat-export scripts and rewrites them into
// factory-wrapped modules for the hosting runtime

pub mod utils;
pub mod core;
pub mod infrastructure;
pub mod cli;
