use crate::core::interfaces::FileSystemService;
use crate::utils::{Result, HostpackError};
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct TokioFileSystemService;

impl TokioFileSystemService {
    fn staging_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".hostpack-tmp");
        path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl FileSystemService for TokioFileSystemService {
    async fn read_file(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).await
            .map_err(HostpackError::Io)
    }

    async fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            self.create_directory(parent).await?;
        }

        // Stage next to the target so the rename stays on one filesystem
        let staging = Self::staging_path(path);
        fs::write(&staging, content).await
            .map_err(HostpackError::Io)?;

        if let Err(e) = fs::rename(&staging, path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(HostpackError::Io(e));
        }
        Ok(())
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await
            .map_err(HostpackError::Io)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HostpackError::Io(e)),
        }
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}
