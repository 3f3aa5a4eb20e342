//! Bounded sliding window over a paginated feed.
//!
//! [`FeedWindow`] is the synchronous half of the feed buffer: it owns the
//! items, the fetch cursor and the index of the item on screen, and never
//! performs IO. Loading is split into a begin step that hands out a
//! [`LoadTicket`] describing the page to fetch, and a completion step that
//! applies the page (or the failure) once it arrives.
//!
//! # Invariants
//!
//! - Items keep the order the source returned them in.
//! - No two items share an id.
//! - After a load completes the window holds at most `buffer_size_max`
//!   items once it has grown past `cleanup_threshold`.
//! - `fetch_offset` never decreases and is never rebased on eviction.
//! - Once `has_more` turns false it stays false until [`FeedWindow::teardown`].
//! - At most one ticket is outstanding. Tickets handed out before a teardown
//!   or re-initialization complete as [`LoadOutcome::Stale`].

use std::collections::HashSet;

use lokitos_backend::PageRequest;
use lokitos_types::{FeedItem, FeedKind, ItemId, UserId};
use thiserror::Error;

use crate::BufferPolicy;
use crate::scroll::{ScrollMetrics, ScrollRatio};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("index {index} is outside the window (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadMode {
    Initial { anchor: Option<ItemId> },
    More,
}

/// Permission to run one fetch. Hand it back to [`FeedWindow::complete_load`]
/// or [`FeedWindow::fail_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a ticket keeps the window in the loading state until completed"]
pub struct LoadTicket {
    generation: u64,
    mode: LoadMode,
    request: PageRequest,
}

impl LoadTicket {
    #[must_use]
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    #[must_use]
    pub fn is_initial(&self) -> bool {
        matches!(self.mode, LoadMode::Initial { .. })
    }
}

/// Items dropped from the window by a load.
///
/// `handles` are the per-item handles that were attached to evicted items,
/// so the caller can stop or release them. `scroll` is where the reader was
/// just before the items went away; hand the reflowed container to
/// [`Eviction::restore_scroll`] to put them back.
#[derive(Debug, Clone, PartialEq)]
pub struct Eviction<H> {
    pub count: usize,
    pub handles: Vec<H>,
    pub scroll: ScrollRatio,
}

impl<H> Eviction<H> {
    /// `scroll_top` to apply once the container has been re-measured.
    #[must_use]
    pub fn restore_scroll(&self, reflowed: ScrollMetrics) -> f64 {
        self.scroll.restore(reflowed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<H> {
    /// Nothing was requested: a load is already running or the source is exhausted.
    Skipped,
    /// The window was torn down or re-initialized while the fetch was in flight.
    Stale,
    Loaded {
        /// Items added after de-duplication.
        appended: usize,
        /// Head items trimmed by a load more, or the previous contents replaced
        /// by an initial load.
        eviction: Option<Eviction<H>>,
    },
}

impl<H> LoadOutcome<H> {
    #[must_use]
    pub fn eviction(&self) -> Option<&Eviction<H>> {
        match self {
            Self::Loaded { eviction, .. } => eviction.as_ref(),
            _ => None,
        }
    }
}

/// Result of moving the viewport onto a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChange {
    pub item_id: ItemId,
    /// Items left after the active one.
    pub remaining: usize,
    /// The caller should start a load now.
    pub should_load: bool,
}

/// Synchronous sliding-window state for one feed.
///
/// `H` is an optional per-item handle (a media player, a rendered row)
/// kept in a table parallel to the items and trimmed with them.
#[derive(Debug)]
pub struct FeedWindow<T, H = ()> {
    kind: FeedKind,
    policy: BufferPolicy,
    items: Vec<T>,
    handles: Vec<Option<H>>,
    fetch_offset: usize,
    has_more: bool,
    active_index: usize,
    loading: bool,
    generation: u64,
    scroll: Option<ScrollMetrics>,
}

impl<T: FeedItem, H> FeedWindow<T, H> {
    #[must_use]
    pub fn new(kind: FeedKind, policy: BufferPolicy) -> Self {
        Self {
            kind,
            policy,
            items: Vec::new(),
            handles: Vec::new(),
            fetch_offset: 0,
            has_more: true,
            active_index: 0,
            loading: false,
            generation: 0,
            scroll: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    #[must_use]
    pub fn policy(&self) -> &BufferPolicy {
        &self.policy
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[must_use]
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    #[must_use]
    pub fn active_item(&self) -> Option<&T> {
        self.items.get(self.active_index)
    }

    #[must_use]
    pub fn fetch_offset(&self) -> usize {
        self.fetch_offset
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Latest measurement of the container rendering this window.
    ///
    /// The next eviction captures its [`ScrollRatio`] from it. Each reading is
    /// used at most once, since the layout it describes is gone after a trim.
    pub fn record_scroll(&mut self, metrics: ScrollMetrics) {
        self.scroll = Some(metrics);
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Start the first page. Supersedes any ticket already handed out.
    pub fn begin_initial(
        &mut self,
        page_size: usize,
        anchor: Option<ItemId>,
        viewer: Option<UserId>,
    ) -> LoadTicket {
        self.generation += 1;
        self.loading = true;
        LoadTicket {
            generation: self.generation,
            request: PageRequest {
                kind: self.kind,
                limit: page_size,
                offset: 0,
                viewer_id: viewer,
                anchor_id: anchor.clone(),
            },
            mode: LoadMode::Initial { anchor },
        }
    }

    /// Start the next page, or `None` while loading or once the source is exhausted.
    pub fn begin_load_more(&mut self, viewer: Option<UserId>) -> Option<LoadTicket> {
        if self.loading || !self.has_more {
            return None;
        }
        self.loading = true;
        Some(LoadTicket {
            generation: self.generation,
            mode: LoadMode::More,
            request: PageRequest {
                kind: self.kind,
                limit: self.policy.load_batch,
                offset: self.fetch_offset,
                viewer_id: viewer,
                anchor_id: None,
            },
        })
    }

    /// Apply a fetched page.
    pub fn complete_load(&mut self, ticket: LoadTicket, mut page: Vec<T>) -> LoadOutcome<H> {
        if ticket.generation != self.generation {
            tracing::debug!(kind = %self.kind, "Dropping page for a superseded load");
            return LoadOutcome::Stale;
        }
        self.loading = false;

        let requested = ticket.request.limit;
        page.truncate(requested);
        let fetched = page.len();

        match ticket.mode {
            LoadMode::Initial { anchor } => {
                let replaced = self.items.len();
                self.items.clear();
                self.scroll = None;
                let handles: Vec<H> = self.handles.drain(..).flatten().collect();
                let eviction = (replaced > 0).then(|| Eviction {
                    count: replaced,
                    handles,
                    scroll: ScrollRatio::TOP,
                });
                let appended = self.append_unique(page);
                self.fetch_offset = requested;
                self.has_more = fetched == requested;
                self.active_index = anchor
                    .as_ref()
                    .and_then(|id| self.position(id))
                    .unwrap_or(0);
                tracing::debug!(
                    kind = %self.kind,
                    items = appended,
                    has_more = self.has_more,
                    "Initial page loaded"
                );
                LoadOutcome::Loaded { appended, eviction }
            }
            LoadMode::More => {
                if fetched == 0 {
                    self.has_more = false;
                    tracing::debug!(
                        kind = %self.kind,
                        offset = self.fetch_offset,
                        "Feed exhausted"
                    );
                    return LoadOutcome::Loaded {
                        appended: 0,
                        eviction: None,
                    };
                }

                let appended = self.append_unique(page);
                let eviction = self.evict_if_needed();
                self.fetch_offset += requested;
                self.has_more = fetched == requested;
                tracing::debug!(
                    kind = %self.kind,
                    appended,
                    evicted = eviction.as_ref().map_or(0, |e| e.count),
                    offset = self.fetch_offset,
                    has_more = self.has_more,
                    "Page appended"
                );
                LoadOutcome::Loaded { appended, eviction }
            }
        }
    }

    /// Record that the fetch for `ticket` failed. Items and `has_more` are untouched.
    ///
    /// Returns `false` for a stale ticket.
    pub fn fail_load(&mut self, ticket: LoadTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.loading = false;
        true
    }

    fn append_unique(&mut self, page: Vec<T>) -> usize {
        let mut seen: HashSet<ItemId> = self.items.iter().map(|item| item.id().clone()).collect();
        let before = self.items.len();
        for item in page {
            if seen.insert(item.id().clone()) {
                self.items.push(item);
                self.handles.push(None);
            } else {
                tracing::trace!(item_id = %item.id(), "Skipping duplicate item");
            }
        }
        self.items.len() - before
    }

    fn evict_if_needed(&mut self) -> Option<Eviction<H>> {
        if self.items.len() <= self.policy.cleanup_threshold {
            return None;
        }
        let scroll = self
            .scroll
            .take()
            .map_or(ScrollRatio::TOP, ScrollRatio::capture);
        let count = self.items.len() - self.policy.buffer_size_max;
        self.items.drain(..count);
        let handles = self.handles.drain(..count).flatten().collect();
        self.active_index = self.active_index.saturating_sub(count);
        self.clamp_active();
        Some(Eviction {
            count,
            handles,
            scroll,
        })
    }

    fn clamp_active(&mut self) {
        self.active_index = self.active_index.min(self.items.len().saturating_sub(1));
    }

    // ------------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------------

    /// Make the item at `index` the active one and apply its optimistic view.
    pub fn set_active(&mut self, index: usize) -> Result<ActiveChange, WindowError> {
        let len = self.items.len();
        let Some(item) = self.items.get_mut(index) else {
            return Err(WindowError::IndexOutOfRange { index, len });
        };
        item.record_local_view();
        let item_id = item.id().clone();
        self.active_index = index;

        let remaining = len - index - 1;
        let should_load =
            remaining <= self.policy.load_threshold && self.has_more && !self.loading;
        Ok(ActiveChange {
            item_id,
            remaining,
            should_load,
        })
    }

    // ------------------------------------------------------------------------
    // Local edits
    // ------------------------------------------------------------------------

    /// Put a freshly created item at the top.
    ///
    /// An existing item with the same id is replaced. The viewer keeps looking
    /// at the same item, and the fetch cursor does not move.
    pub fn prepend_item(&mut self, item: T) {
        let mut handle = None;
        let mut was_active = false;
        if let Some(pos) = self.position(item.id()) {
            self.items.remove(pos);
            handle = self.handles.remove(pos);
            was_active = pos == self.active_index;
            if pos < self.active_index {
                self.active_index -= 1;
            }
        }

        let had_items = !self.items.is_empty();
        self.items.insert(0, item);
        self.handles.insert(0, handle);

        if was_active {
            self.active_index = 0;
        } else if had_items {
            self.active_index += 1;
        }
        self.clamp_active();
    }

    /// Remove an item, typically after it was deleted on the server.
    pub fn remove_item(&mut self, id: &ItemId) -> Option<(T, Option<H>)> {
        let pos = self.position(id)?;
        let item = self.items.remove(pos);
        let handle = self.handles.remove(pos);
        if pos < self.active_index {
            self.active_index -= 1;
        }
        self.clamp_active();
        Some((item, handle))
    }

    /// Apply `update` to the item with `id`. Returns `false` if it is not in the window.
    pub fn update_item(&mut self, id: &ItemId, update: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                update(item);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------------

    /// Attach a handle to the item at `index`, returning the one it replaces.
    pub fn attach_handle(&mut self, index: usize, handle: H) -> Result<Option<H>, WindowError> {
        let len = self.handles.len();
        let slot = self
            .handles
            .get_mut(index)
            .ok_or(WindowError::IndexOutOfRange { index, len })?;
        Ok(slot.replace(handle))
    }

    #[must_use]
    pub fn handle(&self, index: usize) -> Option<&H> {
        self.handles.get(index).and_then(Option::as_ref)
    }

    pub fn detach_handle(&mut self, index: usize) -> Option<H> {
        self.handles.get_mut(index).and_then(Option::take)
    }

    /// Discard everything. Returns attached handles; in-flight tickets become stale.
    pub fn teardown(&mut self) -> Vec<H> {
        self.generation += 1;
        self.items.clear();
        self.fetch_offset = 0;
        self.has_more = true;
        self.active_index = 0;
        self.loading = false;
        self.scroll = None;
        self.handles.drain(..).flatten().collect()
    }
}
