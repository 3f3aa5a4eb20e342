//! Follow graph and profile lookups.

use serde::Serialize;
use serde::de::IgnoredAny;

use lokitos_types::{Profile, ProfileStats, UserId};

use crate::BackendError;
use crate::client::{Attempts, BackendClient, eq};

#[derive(Serialize)]
struct FollowRow<'a> {
    follower_id: &'a UserId,
    following_id: &'a UserId,
}

#[derive(Serialize)]
struct SuggestedArgs<'a> {
    viewer_id: Option<&'a UserId>,
    limit: usize,
}

#[derive(Serialize)]
struct StatsArgs<'a> {
    profile_id: &'a UserId,
}

#[derive(Serialize)]
struct HandleArgs<'a> {
    handle: &'a str,
}

/// Strip characters with meaning in a PostgREST filter so user input stays a plain pattern.
fn sanitize_search(query: &str) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, '*' | ',' | '(' | ')' | '%'))
        .collect::<String>()
        .trim()
        .to_string()
}

impl BackendClient {
    pub async fn follow(&self, target: &UserId) -> Result<(), BackendError> {
        let viewer = self.require_viewer()?;
        if &viewer == target {
            return Err(BackendError::SelfFollow);
        }
        let row = FollowRow {
            follower_id: &viewer,
            following_id: target,
        };
        self.insert_ignoring_duplicates("follows", &row).await?;
        tracing::debug!(user_id = %target, "Followed");
        Ok(())
    }

    pub async fn unfollow(&self, target: &UserId) -> Result<(), BackendError> {
        let viewer = self.require_viewer()?;
        self.delete_where(
            "follows",
            &[("follower_id", eq(&viewer)), ("following_id", eq(target))],
        )
        .await?;
        tracing::debug!(user_id = %target, "Unfollowed");
        Ok(())
    }

    /// Whether the viewer follows `target`. Always false when signed out.
    pub async fn is_following(&self, target: &UserId) -> Result<bool, BackendError> {
        let Some(viewer) = self.current_viewer() else {
            return Ok(false);
        };
        let rows: Vec<IgnoredAny> = self
            .select(
                "follows",
                &[
                    ("follower_id", eq(&viewer)),
                    ("following_id", eq(target)),
                    ("select", "follower_id".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    pub async fn suggested_users(&self, limit: usize) -> Result<Vec<Profile>, BackendError> {
        let viewer = self.current_viewer();
        let args = SuggestedArgs {
            viewer_id: viewer.as_ref(),
            limit,
        };
        self.rpc("suggested_users", &args, Attempts::Retry).await
    }

    /// Case-insensitive substring search on handles. A blank query matches nothing.
    pub async fn search_profiles(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Profile>, BackendError> {
        let pattern = sanitize_search(query);
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "profiles",
            &[
                ("handle", format!("ilike.*{pattern}*")),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn profile_stats(&self, profile: &UserId) -> Result<ProfileStats, BackendError> {
        let args = StatsArgs {
            profile_id: profile,
        };
        self.rpc("profile_stats", &args, Attempts::Retry).await
    }

    pub async fn followers(&self, handle: &str) -> Result<Vec<Profile>, BackendError> {
        self.rpc("followers", &HandleArgs { handle }, Attempts::Retry)
            .await
    }

    pub async fn following(&self, handle: &str) -> Result<Vec<Profile>, BackendError> {
        self.rpc("following", &HandleArgs { handle }, Attempts::Retry)
            .await
    }
}
