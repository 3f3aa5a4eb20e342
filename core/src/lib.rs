//! Feed state for LokitosXelFutbol.
//!
//! The centerpiece is the bounded sliding window shared by the post feed
//! and the video feed: [`FeedWindow`] holds the state and enforces its
//! invariants without doing IO, and [`FeedBuffer`] drives it from a
//! [`PageProvider`](lokitos_backend::PageProvider). Around it sit the
//! pieces a feed screen needs: one-video-at-a-time playback, per-route
//! scroll memory, scroll preservation across reflows, and toasts for
//! failures.

mod buffer;
pub mod playback;
mod policy;
pub mod scroll;
pub mod scroll_memory;
pub mod toast;
pub mod window;

pub use buffer::{FeedBuffer, FeedError};
pub use playback::{Playable, PlaybackCoordinator};
pub use policy::{BufferPolicy, PolicyError};
pub use scroll::{ScrollMetrics, ScrollRatio};
pub use scroll_memory::ScrollMemory;
pub use toast::{Severity, Toast, ToastId, ToastQueue, describe_error};
pub use window::{ActiveChange, Eviction, FeedWindow, LoadOutcome, LoadTicket, WindowError};
