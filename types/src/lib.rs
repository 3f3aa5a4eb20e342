//! Core domain types for LokitosXelFutbol.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod comment;
mod draft;
mod ids;
mod item;
mod media;
mod notification;
mod profile;
mod route;
mod vote;

pub use comment::{Comment, CommentNode, CommentThread, DepthFirst};
pub use draft::{CommentDraft, DraftError, MAX_COMMENT_CHARS, MAX_POST_CHARS, PostDraft};
pub use ids::{ItemId, UserId};
pub use item::{FeedItem, FeedKind, MediaKind, Post, Video};
pub use media::{
    ALLOWED_IMAGE_TYPES, ALLOWED_VIDEO_TYPES, MAX_IMAGE_BYTES, MAX_VIDEO_BYTES, MediaFile,
    MediaValidationError, ValidatedMedia, validate_media,
};
pub use notification::{Notification, NotificationKind, unread_count};
pub use profile::{Profile, ProfileStats};
pub use route::{Route, RouteParseError};
pub use vote::{InvalidVoteError, UserVote, VoteKind, VoteTally};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

// ============================================================================
// NonEmpty String
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("content must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

// ============================================================================
// Text helpers
// ============================================================================

/// Shorten `text` to at most `max` user-perceived characters, ending in `…`.
#[must_use]
pub fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.graphemes(true).count() <= max {
        return text.to_string();
    }
    let head: String = text.graphemes(true).take(max.saturating_sub(1)).collect();
    format!("{}…", head.trim_end())
}
