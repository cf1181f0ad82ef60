//! Access to attachment files on the local disk.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use mediabucket_common::{Error, Result};

/// Local file access used by the export bridge.
#[async_trait]
pub trait LocalFiles: Send + Sync {
    /// Whether a regular file exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    /// Read the whole file.
    ///
    /// # Errors
    /// - `Error::LocalFileMissing` if there is no file at `path`
    /// - `Error::Io` on any other read failure
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Files on the real filesystem, read through `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLocalFiles;

#[async_trait]
impl LocalFiles for FsLocalFiles {
    async fn exists(&self, path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata.is_file(),
            Err(_) => false,
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(data) => {
                debug!(path = %path.display(), size = data.len(), "Local file read");
                Ok(data)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::LocalFileMissing(path.display().to_string()))
            }
            Err(err) => Err(Error::Io(err)),
        }
    }
}

/// Files held in memory.
#[derive(Debug, Default)]
pub struct MemoryLocalFiles {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryLocalFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), data);
    }
}

#[async_trait]
impl LocalFiles for MemoryLocalFiles {
    async fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| Error::LocalFileMissing(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fs_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        tokio::fs::write(&path, b"jpeg").await.unwrap();

        let files = FsLocalFiles;
        assert!(files.exists(&path).await);
        assert!(!files.exists(dir.path()).await);
        assert_eq!(files.read(&path).await.unwrap(), b"jpeg");

        let missing = dir.path().join("gone.jpg");
        assert!(!files.exists(&missing).await);
        assert!(matches!(
            files.read(&missing).await,
            Err(Error::LocalFileMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_files() {
        let files = MemoryLocalFiles::new();
        files.insert("/uploads/a.png", vec![1, 2, 3]);

        assert!(files.exists(Path::new("/uploads/a.png")).await);
        assert_eq!(files.read(Path::new("/uploads/a.png")).await.unwrap(), vec![1, 2, 3]);
        assert!(files.read(Path::new("/uploads/b.png")).await.is_err());
    }
}
