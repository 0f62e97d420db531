use crate::core::models::*;
use crate::utils::Result;
use std::path::Path;
use async_trait::async_trait;

/// File system operations interface
#[async_trait]
pub trait FileSystemService: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<String>;
    /// Replace `path` with `content` without exposing a partially written file
    async fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()>;
    async fn create_directory(&self, path: &Path) -> Result<()>;
    async fn remove_file(&self, path: &Path) -> Result<()>;
    fn file_exists(&self, path: &Path) -> bool;
}

/// Generic code bundler producing one flat-export artifact per descriptor
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(&self, descriptor: &DeploymentDescriptor, profile: &BuildProfile) -> Result<BundledArtifact>;

    fn name(&self) -> &str;
}
