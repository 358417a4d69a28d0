// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Image File Store
//!
//! Writes sniffed images under a root directory with server-generated names.
//!
//! # Security Guarantees
//! - File names are `<uuid-v4><ext>`; nothing from the client reaches the path
//! - A root that is itself a symlink is refused
//! - The resolved target must sit directly inside the canonical root
//! - Files are created with `create_new`, so a planted entry (including a
//!   symlink) at the target name is never followed or overwritten

use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::domain::attachment::{AttachmentError, ImageKind};
use crate::domain::upload::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage root is a symlink: {0}")]
    RootIsSymlink(PathBuf),

    #[error("target escapes storage root: {0}")]
    Escapes(PathBuf),

    #[error("target is a symlink: {0}")]
    SymlinkTarget(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<StoreError> for AttachmentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RootIsSymlink(_) | StoreError::SymlinkTarget(_) => AttachmentError::SymlinkParent,
            StoreError::Escapes(_) => AttachmentError::PathViolation,
            StoreError::Io(e) => AttachmentError::Io(e),
        }
    }
}

impl From<StoreError> for UploadError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RootIsSymlink(_) => UploadError::DirInvalid,
            StoreError::Escapes(_) => UploadError::PathTraversal,
            StoreError::SymlinkTarget(_) => UploadError::SymlinkTraversal,
            StoreError::Io(e) => UploadError::Io(e),
        }
    }
}

/// A file written by [`ImageStore::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: Uuid,
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root if needed and return its canonical form.
    async fn prepare_root(&self) -> Result<PathBuf, StoreError> {
        match tokio::fs::symlink_metadata(&self.root).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                tracing::warn!(root = %self.root.display(), "Refusing symlinked storage root");
                return Err(StoreError::RootIsSymlink(self.root.clone()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&self.root).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(tokio::fs::canonicalize(&self.root).await?)
    }

    /// Write `data` under a fresh UUID name with the extension of `kind`.
    pub async fn store(&self, data: &[u8], kind: ImageKind) -> Result<StoredFile, StoreError> {
        let root = self.prepare_root().await?;
        let id = Uuid::new_v4();
        let filename = format!("{}{}", id, kind.extension());
        let path = root.join(&filename);

        if path.parent() != Some(root.as_path()) {
            return Err(StoreError::Escapes(path));
        }
        if let Ok(meta) = tokio::fs::symlink_metadata(&path).await {
            if meta.file_type().is_symlink() {
                return Err(StoreError::SymlinkTarget(path));
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), size = data.len(), "Stored image");
        Ok(StoredFile { id, filename, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attachment::PNG_MAGIC;

    #[tokio::test]
    async fn test_store_creates_root_and_uuid_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("nested").join("attachments"));

        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(b"payload");
        let stored = store.store(&data, ImageKind::Png).await.unwrap();

        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.filename, format!("{}.png", stored.id));
        assert_eq!(std::fs::read(&stored.path).unwrap(), data);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_root_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let store = ImageStore::new(&link);
        let err = store.store(PNG_MAGIC, ImageKind::Png).await.unwrap_err();
        assert!(matches!(err, StoreError::RootIsSymlink(_)));
        assert!(matches!(UploadError::from(err), UploadError::DirInvalid));
        assert_eq!(std::fs::read_dir(&real).unwrap().count(), 0);
    }
}
