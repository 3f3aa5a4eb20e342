//! Client-side validation of media attachments.
//!
//! Uploads only accept a [`ValidatedMedia`], which can only be obtained through
//! [`MediaFile::validate`]. An oversized or disallowed file therefore never
//! reaches the network layer.

use std::fmt;

use thiserror::Error;

use crate::MediaKind;

/// Maximum size for image attachments (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
/// Maximum size for video attachments (50 MiB).
pub const MAX_VIDEO_BYTES: u64 = 50 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const ALLOWED_VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaValidationError {
    #[error("el archivo está vacío")]
    Empty,
    #[error("tipo de archivo no permitido: {mime}")]
    UnsupportedType { mime: String },
    #[error("el {kind} supera el límite de {} MB ({size} bytes)", .limit / (1024 * 1024))]
    TooLarge { kind: MediaKind, size: u64, limit: u64 },
}

/// Classify a MIME type against the allow-list and enforce the size limit.
///
/// MIME parameters (`; codecs=...`) and case are ignored.
pub fn validate_media(mime: &str, size: u64) -> Result<MediaKind, MediaValidationError> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let (kind, limit) = if ALLOWED_IMAGE_TYPES.contains(&essence.as_str()) {
        (MediaKind::Image, MAX_IMAGE_BYTES)
    } else if ALLOWED_VIDEO_TYPES.contains(&essence.as_str()) {
        (MediaKind::Video, MAX_VIDEO_BYTES)
    } else {
        return Err(MediaValidationError::UnsupportedType {
            mime: mime.to_string(),
        });
    };

    if size == 0 {
        return Err(MediaValidationError::Empty);
    }
    if size > limit {
        return Err(MediaValidationError::TooLarge { kind, size, limit });
    }
    Ok(kind)
}

/// A file picked by the user, not yet validated.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl MediaFile {
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn validate(self) -> Result<ValidatedMedia, MediaValidationError> {
        let kind = validate_media(&self.mime_type, self.size())?;
        Ok(ValidatedMedia { file: self, kind })
    }
}

/// A media file that passed [`validate_media`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMedia {
    file: MediaFile,
    kind: MediaKind,
}

impl ValidatedMedia {
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.file.mime_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.file.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.file.bytes
    }
}
