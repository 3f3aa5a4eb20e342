//! Sizing constants for a feed window.

use lokitos_types::FeedKind;
use thiserror::Error;

/// How large a feed window may grow and when it asks for more.
///
/// - `buffer_size_max`: size the window is trimmed back to after eviction.
/// - `cleanup_threshold`: eviction runs once the window grows past this.
/// - `load_threshold`: a load starts when this many items or fewer remain
///   ahead of the active one.
/// - `load_batch`: page size for every load after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    pub buffer_size_max: usize,
    pub cleanup_threshold: usize,
    pub load_threshold: usize,
    pub load_batch: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("cleanup_threshold ({cleanup}) must exceed buffer_size_max ({max})")]
    CleanupNotAboveMax { cleanup: usize, max: usize },
    #[error("load_threshold ({threshold}) must be below load_batch ({batch})")]
    ThresholdNotBelowBatch { threshold: usize, batch: usize },
}

impl BufferPolicy {
    pub const POSTS: Self = Self {
        buffer_size_max: 20,
        cleanup_threshold: 25,
        load_threshold: 5,
        load_batch: 10,
    };

    pub const VIDEOS: Self = Self {
        buffer_size_max: 15,
        cleanup_threshold: 20,
        load_threshold: 3,
        load_batch: 5,
    };

    pub fn new(
        buffer_size_max: usize,
        cleanup_threshold: usize,
        load_threshold: usize,
        load_batch: usize,
    ) -> Result<Self, PolicyError> {
        let policy = Self {
            buffer_size_max,
            cleanup_threshold,
            load_threshold,
            load_batch,
        };
        policy.validate()?;
        Ok(policy)
    }

    #[must_use]
    pub const fn for_kind(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Posts => Self::POSTS,
            FeedKind::Videos => Self::VIDEOS,
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for (field, value) in [
            ("buffer_size_max", self.buffer_size_max),
            ("cleanup_threshold", self.cleanup_threshold),
            ("load_threshold", self.load_threshold),
            ("load_batch", self.load_batch),
        ] {
            if value == 0 {
                return Err(PolicyError::Zero { field });
            }
        }
        if self.cleanup_threshold <= self.buffer_size_max {
            return Err(PolicyError::CleanupNotAboveMax {
                cleanup: self.cleanup_threshold,
                max: self.buffer_size_max,
            });
        }
        if self.load_threshold >= self.load_batch {
            return Err(PolicyError::ThresholdNotBelowBatch {
                threshold: self.load_threshold,
                batch: self.load_batch,
            });
        }
        Ok(())
    }
}
