//! Like/dislike votes and their aggregate counters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

/// The viewer's own vote on an item. Encoded on the wire as `-1`, `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum UserVote {
    Disliked,
    #[default]
    None,
    Liked,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("user_vote must be -1, 0 or 1 (got {0})")]
pub struct InvalidVoteError(pub i8);

impl TryFrom<i8> for UserVote {
    type Error = InvalidVoteError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Disliked),
            0 => Ok(Self::None),
            1 => Ok(Self::Liked),
            other => Err(InvalidVoteError(other)),
        }
    }
}

impl From<UserVote> for i8 {
    fn from(value: UserVote) -> Self {
        match value {
            UserVote::Disliked => -1,
            UserVote::None => 0,
            UserVote::Liked => 1,
        }
    }
}

impl From<VoteKind> for UserVote {
    fn from(kind: VoteKind) -> Self {
        match kind {
            VoteKind::Like => Self::Liked,
            VoteKind::Dislike => Self::Disliked,
        }
    }
}

/// Aggregate vote counters as returned by the vote toggle endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub dislikes_count: u64,
    #[serde(default)]
    pub user_vote: UserVote,
}

impl VoteTally {
    /// The tally after the viewer casts `kind`.
    ///
    /// Casting the same kind twice removes the vote; casting the opposite kind
    /// moves it. This mirrors the server so the UI can apply it optimistically.
    #[must_use]
    pub fn toggled(self, kind: VoteKind) -> Self {
        let mut next = self;
        match self.user_vote {
            UserVote::Liked => next.likes_count = next.likes_count.saturating_sub(1),
            UserVote::Disliked => next.dislikes_count = next.dislikes_count.saturating_sub(1),
            UserVote::None => {}
        }

        if self.user_vote == UserVote::from(kind) {
            next.user_vote = UserVote::None;
            return next;
        }

        match kind {
            VoteKind::Like => next.likes_count += 1,
            VoteKind::Dislike => next.dislikes_count += 1,
        }
        next.user_vote = kind.into();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::{UserVote, VoteKind, VoteTally};

    fn tally(likes: u64, dislikes: u64, user_vote: UserVote) -> VoteTally {
        VoteTally {
            likes_count: likes,
            dislikes_count: dislikes,
            user_vote,
        }
    }

    #[test]
    fn like_then_like_restores_original() {
        let original = tally(4, 1, UserVote::None);
        let liked = original.toggled(VoteKind::Like);
        assert_eq!(liked, tally(5, 1, UserVote::Liked));
        assert_eq!(liked.toggled(VoteKind::Like), original);
    }

    #[test]
    fn dislike_moves_existing_like() {
        let liked = tally(5, 1, UserVote::Liked);
        assert_eq!(
            liked.toggled(VoteKind::Dislike),
            tally(4, 2, UserVote::Disliked)
        );
    }

    #[test]
    fn counters_never_underflow() {
        let inconsistent = tally(0, 0, UserVote::Liked);
        assert_eq!(
            inconsistent.toggled(VoteKind::Like),
            tally(0, 0, UserVote::None)
        );
    }

    #[test]
    fn user_vote_wire_encoding() {
        let parsed: VoteTally =
            serde_json::from_str(r#"{"likes_count":3,"dislikes_count":0,"user_vote":-1}"#)
                .unwrap();
        assert_eq!(parsed.user_vote, UserVote::Disliked);
        assert_eq!(serde_json::to_value(UserVote::Liked).unwrap(), 1);
        assert!(serde_json::from_str::<UserVote>("2").is_err());
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let parsed: VoteTally = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, VoteTally::default());
    }
}
