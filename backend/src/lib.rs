//! Client for the hosted backend that stores posts, videos, comments, votes,
//! follows and media.
//!
//! # Architecture
//!
//! - [`BackendClient`] - authenticated HTTP client; every other module adds
//!   inherent methods to it (content, media, social graph, notifications).
//! - [`PageProvider`] - the seam the feed buffer depends on. [`RemoteFeed`]
//!   implements it over the `feed_page` RPC; tests substitute in-memory fakes.
//! - [`SessionStore`] - the signed-in viewer, observable through a
//!   [`tokio::sync::watch`] channel.
//! - [`retry`] - exponential backoff for idempotent requests.
//!
//! # Wire Format
//!
//! JSON over HTTPS against a PostgREST-style surface:
//!
//! | Surface | Path |
//! |---------|------|
//! | Tables | `/rest/v1/{table}?{column}=eq.{value}` |
//! | RPC | `/rest/v1/rpc/{function}` (POST, JSON arguments) |
//! | Storage | `/storage/v1/upload` (multipart) |
//! | Auth | `/auth/v1/token`, `/auth/v1/logout` |
//!
//! # Error Handling
//!
//! Every call returns [`BackendError`]. Non-2xx responses carry the status and
//! a capped copy of the body; validation failures never reach the network.

mod client;
mod content;
mod feed;
mod media;
mod notifications;
pub mod retry;
mod session;
mod social;

pub use client::{AnonKey, BackendClient, BackendConfig};
pub use content::DeleteReport;
pub use feed::{PageProvider, PageRequest, RemoteFeed};
pub use session::{Session, SessionStore};

pub use lokitos_types;
pub use reqwest::StatusCode;

use lokitos_types::DraftError;

const MAX_ERROR_BODY_BYTES: usize = 16 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend error {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("request failed after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("sign in required")]
    NotSignedIn,
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] DraftError),
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
    #[error("backend url must use https: {0}")]
    InsecureUrl(String),
    #[error("anon key contains characters not allowed in a header")]
    InvalidAnonKey,
    #[error("cannot follow yourself")]
    SelfFollow,
}

impl BackendError {
    /// Whether the viewer must (re)authenticate before retrying.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::NotSignedIn => true,
            Self::Http { status, .. } => {
                matches!(*status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            }
            _ => false,
        }
    }

    /// Failures where trying the same call again later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Transport(_) => true,
            Self::Http { status, .. } => retry::is_retryable_status(*status),
            _ => false,
        }
    }
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
