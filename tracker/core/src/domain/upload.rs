// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use thiserror::Error;

/// Stored upload; `id` is the UUID the file is named after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: String,
    pub mime: String,
    pub size: usize,
    pub filename: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Filename is required")]
    MissingName,

    #[error("Invalid filename")]
    BadName,

    #[error("Multipart field 'file' is required")]
    MissingFile,

    #[error("Upload exceeds size limit")]
    TooLarge,

    #[error("Only png and jpeg images are supported")]
    BadType { received_type: Option<String> },

    #[error("Upload directory must not be a symlink")]
    DirInvalid,

    #[error("Upload path is not allowed")]
    PathTraversal,

    #[error("Upload path crosses a symlink")]
    SymlinkTraversal,

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Upload storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Reject client filenames that carry any path structure.
///
/// The name is only checked, never used for storage.
pub fn validate_upload_filename(filename: &str) -> Result<(), UploadError> {
    if filename.is_empty() {
        return Err(UploadError::MissingName);
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') || filename.contains('\0') {
        return Err(UploadError::BadName);
    }
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == filename => Ok(()),
        _ => Err(UploadError::BadName),
    }
}
