// Infrastructure layer
pub mod file_system;
pub mod esbuild;
pub mod processors;

pub use file_system::*;
pub use esbuild::*;
pub use processors::*;
