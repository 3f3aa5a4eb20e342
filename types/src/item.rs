//! Feed items: text posts and vertical videos.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, Profile, VoteTally};

/// Which paginated source a feed reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Posts,
    Videos,
}

impl FeedKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Videos => "videos",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry the feed buffer can hold.
///
/// The buffer only looks at `id`; everything else is payload for the renderer.
pub trait FeedItem {
    fn id(&self) -> &ItemId;

    /// Optimistic local `+1` applied when the item becomes active.
    fn record_local_view(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: ItemId,
    pub author: Profile,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_kind: Option<MediaKind>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub votes: VoteTally,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub views_count: u64,
}

impl FeedItem for Post {
    fn id(&self) -> &ItemId {
        &self.id
    }

    fn record_local_view(&mut self) {
        self.views_count = self.views_count.saturating_add(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: ItemId,
    pub author: Profile,
    pub video_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub votes: VoteTally,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub views_count: u64,
}

impl FeedItem for Video {
    fn id(&self) -> &ItemId {
        &self.id
    }

    fn record_local_view(&mut self) {
        self.views_count = self.views_count.saturating_add(1);
    }
}
