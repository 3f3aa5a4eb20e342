//! Post and comment composition.
//!
//! Drafts are validated synchronously at construction, before any upload or
//! insert is attempted.

use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use crate::{ItemId, MediaFile, MediaValidationError, NonEmptyString, ValidatedMedia};

/// Maximum post length, counted in user-perceived characters.
pub const MAX_POST_CHARS: usize = 280;
/// Maximum comment length, counted in user-perceived characters.
pub const MAX_COMMENT_CHARS: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("la publicación no puede estar vacía")]
    Empty,
    #[error("el texto supera los {max} caracteres ({len})")]
    TooLong { len: usize, max: usize },
    #[error(transparent)]
    Media(#[from] MediaValidationError),
}

fn check_length(text: &str, max: usize) -> Result<(), DraftError> {
    let len = text.graphemes(true).count();
    if len > max {
        return Err(DraftError::TooLong { len, max });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    content: String,
    media: Option<ValidatedMedia>,
}

impl PostDraft {
    /// A post needs text, media, or both.
    pub fn new(content: impl Into<String>, media: Option<MediaFile>) -> Result<Self, DraftError> {
        let content: String = content.into();
        let content = content.trim().to_string();
        let media = media.map(MediaFile::validate).transpose()?;
        if content.is_empty() && media.is_none() {
            return Err(DraftError::Empty);
        }
        check_length(&content, MAX_POST_CHARS)?;
        Ok(Self { content, media })
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn media(&self) -> Option<&ValidatedMedia> {
        self.media.as_ref()
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Option<ValidatedMedia>) {
        (self.content, self.media)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub post_id: ItemId,
    pub parent_id: Option<ItemId>,
    content: NonEmptyString,
}

impl CommentDraft {
    pub fn new(
        post_id: ItemId,
        parent_id: Option<ItemId>,
        content: impl Into<String>,
    ) -> Result<Self, DraftError> {
        let content: String = content.into();
        let content = NonEmptyString::new(content.trim()).map_err(|_| DraftError::Empty)?;
        check_length(&content, MAX_COMMENT_CHARS)?;
        Ok(Self {
            post_id,
            parent_id,
            content,
        })
    }

    #[must_use]
    pub fn content(&self) -> &str {
        self.content.as_str()
    }
}
