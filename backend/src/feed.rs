//! Paginated feed source.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use lokitos_types::{FeedItem, FeedKind, ItemId, Post, UserId, Video};

use crate::BackendError;
use crate::client::{Attempts, BackendClient};

/// One page of a reverse-chronological feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub kind: FeedKind,
    pub limit: usize,
    pub offset: usize,
    pub viewer_id: Option<UserId>,
    /// Deep-link target the page should contain, if any.
    pub anchor_id: Option<ItemId>,
}

/// Source of feed pages, and the "register view" side effect that goes with it.
///
/// A page holds at most `limit` items, newest first. A short page means the
/// source is exhausted.
pub trait PageProvider {
    type Item: FeedItem;

    fn kind(&self) -> FeedKind;

    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Vec<Self::Item>, BackendError>> + Send;

    /// Fire-and-forget view counter increment. Not deduplicated.
    fn register_view(
        &self,
        item: &ItemId,
        viewer: Option<&UserId>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// [`PageProvider`] backed by the `feed_page` RPC.
pub struct RemoteFeed<T> {
    client: BackendClient,
    kind: FeedKind,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for RemoteFeed<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            kind: self.kind,
            _item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for RemoteFeed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFeed").field("kind", &self.kind).finish()
    }
}

impl BackendClient {
    #[must_use]
    pub fn post_feed(&self) -> RemoteFeed<Post> {
        RemoteFeed {
            client: self.clone(),
            kind: FeedKind::Posts,
            _item: PhantomData,
        }
    }

    #[must_use]
    pub fn video_feed(&self) -> RemoteFeed<Video> {
        RemoteFeed {
            client: self.clone(),
            kind: FeedKind::Videos,
            _item: PhantomData,
        }
    }
}

impl<T> PageProvider for RemoteFeed<T>
where
    T: FeedItem + DeserializeOwned + Send,
{
    type Item = T;

    fn kind(&self) -> FeedKind {
        self.kind
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<T>, BackendError> {
        let mut items: Vec<T> = self
            .client
            .rpc("feed_page", request, Attempts::Retry)
            .await?;

        if items.len() > request.limit {
            tracing::warn!(
                kind = %request.kind,
                limit = request.limit,
                returned = items.len(),
                "Backend returned an oversized page; truncating"
            );
            items.truncate(request.limit);
        }

        tracing::debug!(
            kind = %request.kind,
            offset = request.offset,
            limit = request.limit,
            returned = items.len(),
            "Fetched feed page"
        );
        Ok(items)
    }

    async fn register_view(
        &self,
        item: &ItemId,
        viewer: Option<&UserId>,
    ) -> Result<(), BackendError> {
        self.client.register_view(item, viewer).await
    }
}
