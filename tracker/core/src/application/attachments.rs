// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Chore attachments and raw image uploads.
//!
//! Both accept only PNG or JPEG content up to
//! [`MAX_ATTACHMENT_BYTES`](crate::domain::attachment::MAX_ATTACHMENT_BYTES)
//! and store it under a generated name through an [`ImageStore`].

use base64::Engine;
use std::sync::Arc;
use tracing::info;

use crate::application::TrackerError;
use crate::domain::attachment::{check_attachment, sniff_image, AttachmentError, AttachmentMeta, MAX_ATTACHMENT_BYTES};
use crate::domain::chore::ChoreId;
use crate::domain::repository::{ChoreRepository, UploadRepository};
use crate::domain::upload::{validate_upload_filename, UploadError, UploadRecord};
use crate::infrastructure::file_store::ImageStore;

pub struct AttachmentService {
    chores: Arc<dyn ChoreRepository>,
    store: ImageStore,
}

impl AttachmentService {
    pub fn new(chores: Arc<dyn ChoreRepository>, store: ImageStore) -> Self {
        Self { chores, store }
    }

    /// Decode a base64 body and attach it to an existing chore.
    pub async fn attach(&self, chore_id: ChoreId, content_b64: &str) -> Result<AttachmentMeta, TrackerError> {
        if self.chores.find_by_id(chore_id).await?.is_none() {
            return Err(TrackerError::ChoreNotFound(chore_id));
        }

        let data = base64::engine::general_purpose::STANDARD
            .decode(content_b64.trim())
            .map_err(|_| AttachmentError::InvalidEncoding)?;
        let kind = check_attachment(&data)?;

        let stored = self.store.store(&data, kind).await.map_err(AttachmentError::from)?;
        info!(%chore_id, filename = %stored.filename, size = data.len(), "Attachment stored");

        Ok(AttachmentMeta {
            filename: stored.filename,
            content_type: kind.mime_type().to_string(),
            size: data.len(),
        })
    }
}

/// A multipart `file` part as received.
#[derive(Debug, Clone, Default)]
pub struct IncomingUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

pub struct UploadService {
    uploads: Arc<dyn UploadRepository>,
    store: ImageStore,
}

impl UploadService {
    pub fn new(uploads: Arc<dyn UploadRepository>, store: ImageStore) -> Self {
        Self { uploads, store }
    }

    pub async fn save(&self, upload: IncomingUpload) -> Result<UploadRecord, TrackerError> {
        validate_upload_filename(upload.filename.as_deref().unwrap_or_default())?;
        if upload.data.len() > MAX_ATTACHMENT_BYTES {
            return Err(UploadError::TooLarge.into());
        }
        let kind = sniff_image(&upload.data).ok_or(UploadError::BadType {
            received_type: upload.content_type.clone(),
        })?;

        let stored = self.store.store(&upload.data, kind).await.map_err(UploadError::from)?;
        let record = UploadRecord {
            id: stored.id.to_string(),
            mime: kind.mime_type().to_string(),
            size: upload.data.len(),
            filename: stored.filename,
        };
        self.uploads.save(record.clone()).await?;
        info!(upload_id = %record.id, size = record.size, mime = %record.mime, "Upload stored");
        Ok(record)
    }
}
