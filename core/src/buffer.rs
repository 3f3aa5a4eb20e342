//! Async driver that feeds a [`FeedWindow`] from a [`PageProvider`].

use lokitos_backend::{BackendError, PageProvider};
use lokitos_types::{ItemId, UserId};
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

use crate::BufferPolicy;
use crate::scroll::ScrollMetrics;
use crate::window::{FeedWindow, LoadOutcome, WindowError};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl FeedError {
    #[must_use]
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(e) => Some(e),
            Self::Window(_) => None,
        }
    }
}

/// One feed screen: a window plus the provider that fills it.
///
/// Every method takes `&mut self`, so loads never overlap. View
/// registration runs in the background on tasks the buffer owns: callers
/// never wait on it while scrolling, and [`FeedBuffer::flush_views`] drains
/// whatever is still in flight before the session ends. Dropping the buffer
/// aborts unflushed registrations.
pub struct FeedBuffer<P: PageProvider, H = ()> {
    provider: P,
    window: FeedWindow<P::Item, H>,
    viewer: Option<UserId>,
    views: JoinSet<()>,
}

impl<P, H> FeedBuffer<P, H>
where
    P: PageProvider + Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(provider: P, policy: BufferPolicy) -> Self {
        let window = FeedWindow::new(provider.kind(), policy);
        Self {
            provider,
            window,
            viewer: None,
            views: JoinSet::new(),
        }
    }

    #[must_use]
    pub fn window(&self) -> &FeedWindow<P::Item, H> {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut FeedWindow<P::Item, H> {
        &mut self.window
    }

    #[must_use]
    pub fn viewer(&self) -> Option<&UserId> {
        self.viewer.as_ref()
    }

    /// Viewer sent with every page and view. Takes effect on the next request.
    pub fn set_viewer(&mut self, viewer: Option<UserId>) {
        self.viewer = viewer;
    }

    /// Load the first page, optionally positioned on a deep-linked item.
    pub async fn initialize(
        &mut self,
        page_size: usize,
        anchor: Option<ItemId>,
    ) -> Result<LoadOutcome<H>, FeedError> {
        let ticket = self
            .window
            .begin_initial(page_size, anchor, self.viewer.clone());
        match self.provider.fetch_page(ticket.request()).await {
            Ok(page) => Ok(self.window.complete_load(ticket, page)),
            Err(e) => {
                self.window.fail_load(ticket);
                tracing::warn!(kind = %self.window.kind(), error = %e, "Initial load failed");
                Err(e.into())
            }
        }
    }

    /// Fetch the next page if none is in flight and the source is not exhausted.
    pub async fn load_more(&mut self) -> Result<LoadOutcome<H>, FeedError> {
        let Some(ticket) = self.window.begin_load_more(self.viewer.clone()) else {
            return Ok(LoadOutcome::Skipped);
        };
        match self.provider.fetch_page(ticket.request()).await {
            Ok(page) => Ok(self.window.complete_load(ticket, page)),
            Err(e) => {
                let offset = ticket.request().offset;
                self.window.fail_load(ticket);
                tracing::warn!(kind = %self.window.kind(), offset, error = %e, "Load more failed");
                Err(e.into())
            }
        }
    }

    /// The viewport settled on `index`.
    ///
    /// Counts a view for the item (locally right away, remotely in the
    /// background) and loads the next page when close to the end.
    pub async fn on_viewport_index_changed(
        &mut self,
        index: usize,
    ) -> Result<LoadOutcome<H>, FeedError> {
        let change = self.window.set_active(index)?;
        self.spawn_view(change.item_id);

        if change.should_load {
            self.load_more().await
        } else {
            Ok(LoadOutcome::Skipped)
        }
    }

    /// Forward the reader's scroll container measurements to the window.
    pub fn record_scroll(&mut self, metrics: ScrollMetrics) {
        self.window.record_scroll(metrics);
    }

    fn spawn_view(&mut self, item: ItemId) {
        while let Some(finished) = self.views.try_join_next() {
            log_view_task(finished);
        }
        let provider = self.provider.clone();
        let viewer = self.viewer.clone();
        self.views.spawn(async move {
            if let Err(e) = provider.register_view(&item, viewer.as_ref()).await {
                tracing::warn!(item_id = %item, error = %e, "Failed to register view");
            }
        });
    }

    /// View registrations spawned and not yet reaped.
    #[must_use]
    pub fn pending_views(&self) -> usize {
        self.views.len()
    }

    /// Wait for every view registration still in flight.
    ///
    /// Call before signing out or exiting so counted views reach the server.
    pub async fn flush_views(&mut self) {
        let pending = self.views.len();
        if pending > 0 {
            tracing::debug!(kind = %self.window.kind(), pending, "Flushing view registrations");
        }
        while let Some(finished) = self.views.join_next().await {
            log_view_task(finished);
        }
    }

    pub fn prepend_item(&mut self, item: P::Item) {
        self.window.prepend_item(item);
    }

    pub fn remove_item(&mut self, id: &ItemId) -> Option<(P::Item, Option<H>)> {
        self.window.remove_item(id)
    }

    /// Drop all items. Returns attached handles so the caller can release them.
    pub fn teardown(&mut self) -> Vec<H> {
        self.window.teardown()
    }
}

fn log_view_task(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        tracing::warn!(error = %e, "View registration task failed");
    }
}
