//! Filesystem capability used by the supervisor.
//!
//! The supervisor never touches `std::fs` directly; every directory and file
//! operation goes through [`OutputFs`] so tests can inject failures.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hf_core::Result;

/// The narrow set of filesystem operations a transcode job needs.
#[async_trait]
pub trait OutputFs: Send + Sync {
    /// Whether anything exists at `path`.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Whether `path` is an existing regular file.
    async fn is_file(&self, path: &Path) -> Result<bool>;

    /// Create `path` and any missing parents. Succeeds if it already exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()>;

    /// Entries directly inside `path`, sorted by path.
    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Create or truncate `path` and write `contents`.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;

    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove an empty directory.
    async fn remove_dir(&self, path: &Path) -> Result<()>;

    /// Remove a directory and everything below it.
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// [`OutputFs`] over the local filesystem via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl OutputFs for LocalFs {
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn is_file(&self, path: &Path) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        Ok(tokio::fs::create_dir_all(path).await?)
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        Ok(tokio::fs::write(path, contents).await?)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        Ok(tokio::fs::remove_file(path).await?)
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        Ok(tokio::fs::remove_dir(path).await?)
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        Ok(tokio::fs::remove_dir_all(path).await?)
    }
}
