//! Posts, comments, votes and views.

use serde::Serialize;

use lokitos_types::{
    Comment, CommentDraft, CommentThread, ItemId, Post, PostDraft, UserId, VoteKind, VoteTally,
};

use crate::BackendError;
use crate::client::{Attempts, BackendClient, eq};

const POST_SELECT: &str = "*,author:profiles(*)";
const COMMENT_SELECT: &str = "*,author:profiles(*)";

/// Tables holding rows that reference a post, deleted before the post itself.
const POST_DEPENDENTS: [&str; 3] = ["votes", "views", "comments"];

/// Outcome of a cascading delete. The post row itself is always gone when this is returned.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub failed_dependents: Vec<&'static str>,
}

impl DeleteReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_dependents.is_empty()
    }
}

#[derive(Serialize)]
struct NewPost<'a> {
    author_id: &'a UserId,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_kind: Option<&'a str>,
}

#[derive(Serialize)]
struct NewComment<'a> {
    post_id: &'a ItemId,
    parent_id: Option<&'a ItemId>,
    author_id: &'a UserId,
    content: &'a str,
}

#[derive(Serialize)]
struct VoteArgs<'a> {
    item_id: &'a ItemId,
    viewer_id: &'a UserId,
    vote_kind: &'a str,
}

#[derive(Serialize)]
struct ViewArgs<'a> {
    item_id: &'a ItemId,
    viewer_id: Option<&'a UserId>,
}

impl BackendClient {
    /// Upload the draft's media (if any), then insert the post.
    ///
    /// Drafts are validated on construction, so nothing here can fail
    /// validation; a missing session fails before any request.
    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, BackendError> {
        let author = self.require_viewer()?;
        let (content, media) = draft.into_parts();

        let uploaded = match media {
            Some(media) => {
                let kind = media.kind();
                Some((self.upload(media).await?, kind))
            }
            None => None,
        };

        let row = NewPost {
            author_id: &author,
            content: &content,
            media_url: uploaded.as_ref().map(|(url, _)| url.as_str()),
            media_kind: uploaded.as_ref().map(|(_, kind)| kind.as_str()),
        };
        let post: Post = self.insert("posts", POST_SELECT, &row).await?;
        tracing::info!(item_id = %post.id, has_media = uploaded.is_some(), "Created post");
        Ok(post)
    }

    pub async fn get_post(&self, id: &ItemId) -> Result<Post, BackendError> {
        let rows: Vec<Post> = self
            .select(
                "posts",
                &[("id", eq(id)), ("select", POST_SELECT.to_string())],
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("post {id}")))
    }

    /// Delete a post and, best-effort, the rows that reference it.
    ///
    /// A failing dependent delete is logged and reported but does not stop
    /// the post delete. Only a failure deleting the post row is an error.
    pub async fn delete_post(&self, id: &ItemId) -> Result<DeleteReport, BackendError> {
        self.require_viewer()?;
        let mut report = DeleteReport::default();

        for table in POST_DEPENDENTS {
            if let Err(e) = self.delete_where(table, &[("post_id", eq(id))]).await {
                tracing::warn!(item_id = %id, table, error = %e, "Dependent delete failed");
                report.failed_dependents.push(table);
            }
        }

        self.delete_where("posts", &[("id", eq(id))]).await?;
        tracing::info!(item_id = %id, clean = report.is_clean(), "Deleted post");
        Ok(report)
    }

    pub async fn comment_tree(&self, post_id: &ItemId) -> Result<CommentThread, BackendError> {
        let rows: Vec<Comment> = self
            .select(
                "comments",
                &[
                    ("post_id", eq(post_id)),
                    ("select", COMMENT_SELECT.to_string()),
                    ("order", "created_at.asc".to_string()),
                ],
            )
            .await?;
        Ok(CommentThread::from_rows(rows))
    }

    pub async fn create_comment(&self, draft: &CommentDraft) -> Result<Comment, BackendError> {
        let author = self.require_viewer()?;
        let row = NewComment {
            post_id: &draft.post_id,
            parent_id: draft.parent_id.as_ref(),
            author_id: &author,
            content: draft.content(),
        };
        let comment: Comment = self.insert("comments", COMMENT_SELECT, &row).await?;
        tracing::debug!(
            item_id = %comment.id,
            post_id = %comment.post_id,
            reply = comment.parent_id.is_some(),
            "Created comment"
        );
        Ok(comment)
    }

    /// Toggle the viewer's vote on a post, video or comment.
    ///
    /// Voting the same kind twice removes the vote. The returned tally is
    /// the server's, which callers should prefer over any local guess.
    pub async fn vote(&self, item: &ItemId, kind: VoteKind) -> Result<VoteTally, BackendError> {
        let viewer = self.require_viewer()?;
        let args = VoteArgs {
            item_id: item,
            viewer_id: &viewer,
            vote_kind: kind.as_str(),
        };
        self.rpc("toggle_vote", &args, Attempts::Once).await
    }

    /// Increment an item's view counter. Anonymous views are counted too.
    pub async fn register_view(
        &self,
        item: &ItemId,
        viewer: Option<&UserId>,
    ) -> Result<(), BackendError> {
        let args = ViewArgs {
            item_id: item,
            viewer_id: viewer,
        };
        self.rpc_unit("register_view", &args, Attempts::Once).await
    }
}
