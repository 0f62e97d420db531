// Core domain layer
pub mod models;
pub mod registry;
pub mod services;
pub mod interfaces;

pub use models::*;
pub use registry::*;
pub use services::*;
pub use interfaces::*;
