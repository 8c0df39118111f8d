//! Local asset storage
//!
//! Holds the binary assets (images, attached files) referenced from note
//! content. Assets live under a root directory split per kind:
//! `<root>/images` and `<root>/files`. A content item references an asset
//! by plain filesystem path; a reference that no longer resolves is
//! reported as absent, not as an error.

use crate::config;
use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem asset store
#[derive(Clone)]
pub struct AssetStore {
    root: PathBuf,
    images_dir: PathBuf,
    files_dir: PathBuf,
}

impl AssetStore {
    /// Create an asset store rooted at the given directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            images_dir: root.join(config::IMAGES_DIR),
            files_dir: root.join(config::FILES_DIR),
            root,
        }
    }

    /// Initialize the store (create directories if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.images_dir).await?;
        fs::create_dir_all(&self.files_dir).await?;
        tracing::info!("Asset store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Open an asset by reference and read its bytes.
    ///
    /// Returns `Ok(None)` when the reference does not resolve anymore
    /// (deleted or revoked source); other I/O failures are errors.
    pub async fn open_read(&self, reference: &str) -> Result<Option<Vec<u8>>> {
        if reference.is_empty() {
            return Ok(None);
        }

        match fs::read(Path::new(reference)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Copy an image into permanent storage, keeping the source file name.
    /// Returns the new permanent path.
    pub async fn materialize_image(&self, src: &Path) -> Result<PathBuf> {
        self.materialize_into(src, &self.images_dir).await
    }

    /// Copy an attached file into permanent storage, keeping the source
    /// file name. Returns the new permanent path.
    pub async fn materialize_file(&self, src: &Path) -> Result<PathBuf> {
        self.materialize_into(src, &self.files_dir).await
    }

    async fn materialize_into(&self, src: &Path, dir: &Path) -> Result<PathBuf> {
        let name = src
            .file_name()
            .ok_or_else(|| AppError::AssetStore(format!("No file name in {:?}", src)))?;
        let dest = dir.join(name);

        fs::copy(src, &dest).await?;

        tracing::debug!("Materialized asset: {:?} -> {:?}", src, dest);
        Ok(dest)
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (AssetStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = AssetStore::new(temp_dir.path().join("assets"));
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_open_read_resolves_existing_path() {
        let (store, temp) = create_test_store().await;

        let source = temp.path().join("photo.png");
        fs::write(&source, b"png bytes").await.unwrap();

        let data = store
            .open_read(source.to_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data, b"png bytes");
    }

    #[tokio::test]
    async fn test_open_read_missing_is_none() {
        let (store, temp) = create_test_store().await;

        let gone = temp.path().join("gone.png");
        let result = store.open_read(gone.to_str().unwrap()).await.unwrap();
        assert!(result.is_none());

        assert!(store.open_read("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_materialize_copies_under_same_name() {
        let (store, temp) = create_test_store().await;

        let source = temp.path().join("abc123.png");
        fs::write(&source, b"image").await.unwrap();

        let dest = store.materialize_image(&source).await.unwrap();

        assert_eq!(dest, store.images_dir().join("abc123.png"));
        assert_eq!(fs::read(&dest).await.unwrap(), b"image");
        // The source is copied, not moved
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_materialize_file_goes_to_files_dir() {
        let (store, temp) = create_test_store().await;

        let source = temp.path().join("uuid_report.pdf");
        fs::write(&source, b"pdf").await.unwrap();

        let dest = store.materialize_file(&source).await.unwrap();
        assert!(dest.starts_with(store.files_dir()));
    }
}
