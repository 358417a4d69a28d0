// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Attachment Content Policy
//!
//! Chore attachments and raw uploads are only ever PNG or JPEG images, and
//! the type is decided from the bytes, never from a client-supplied name or
//! `Content-Type`.
//!
//! # Security Guarantees
//! - PNG requires the full 8-byte signature
//! - JPEG requires both the SOI prefix and the EOI trailer, and the SOI
//!   must be followed by a marker byte (`FF D8 FF`); a bare `FF D8` start
//!   is rejected even when the data ends in `FF D9`
//! - Stored names are server-generated UUIDs; the client never picks a path

use serde::Serialize;
use thiserror::Error;

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
pub const JPEG_SOI: &[u8] = b"\xff\xd8";
pub const JPEG_EOI: &[u8] = b"\xff\xd9";

/// Size ceiling shared by attachments and uploads.
pub const MAX_ATTACHMENT_BYTES: usize = 5_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
        }
    }
}

/// Identify the image type from content.
pub fn sniff_image(data: &[u8]) -> Option<ImageKind> {
    let detected = infer::get(data)?;
    match detected.mime_type() {
        "image/png" if data.starts_with(PNG_MAGIC) => Some(ImageKind::Png),
        "image/jpeg" if data.starts_with(JPEG_SOI) && data.ends_with(JPEG_EOI) => Some(ImageKind::Jpeg),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentMeta {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment payload is empty")]
    Empty,

    #[error("Attachment exceeds size limit")]
    TooLarge,

    #[error("Attachment must be PNG or JPEG image")]
    UnsupportedType,

    #[error("Attachment content is not valid base64")]
    InvalidEncoding,

    #[error("Attachment path escapes root directory")]
    PathViolation,

    #[error("Attachment root contains a symlinked directory")]
    SymlinkParent,

    #[error("Attachment storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Size and type checks for an attachment body. Returns the detected kind.
pub fn check_attachment(data: &[u8]) -> Result<ImageKind, AttachmentError> {
    if data.is_empty() {
        return Err(AttachmentError::Empty);
    }
    if data.len() > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge);
    }
    sniff_image(data).ok_or(AttachmentError::UnsupportedType)
}
