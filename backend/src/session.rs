//! Signed-in session and the password sign-in flow.
//!
//! The token exchange itself is the provider's business; this module only
//! keeps the resulting access token and viewer id, and lets the rest of the
//! app observe changes through a watch channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use lokitos_types::UserId;

use crate::BackendError;
use crate::client::{Attempts, BackendClient, decode};

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub viewer: UserId,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("viewer", &self.viewer)
            .finish()
    }
}

/// Current session, shared by every clone of a [`BackendClient`].
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Option<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn current_viewer(&self) -> Option<UserId> {
        self.tx.borrow().as_ref().map(|s| s.viewer.clone())
    }

    pub(crate) fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.access_token.clone())
    }

    /// Observe sign-in and sign-out. The receiver starts at the current value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// Replace the session, notifying subscribers.
    pub fn set(&self, session: Option<Session>) {
        self.tx.send_replace(session);
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: UserId,
}

impl BackendClient {
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserId, BackendError> {
        let mut url = self.endpoint("/auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let grant = PasswordGrant { email, password };

        let response = self
            .send(|http| http.post(url.clone()).json(&grant), Attempts::Once)
            .await?;
        let token: TokenResponse = decode(response).await?;

        let viewer = token.user.id;
        self.session().set(Some(Session {
            access_token: token.access_token,
            viewer: viewer.clone(),
        }));
        tracing::info!(viewer = %viewer, "Signed in");
        Ok(viewer)
    }

    /// End the session. The local session is cleared even if the server call fails.
    pub async fn sign_out(&self) {
        if self.session().current().is_none() {
            return;
        }

        let result: Result<(), BackendError> = async {
            let url = self.endpoint("/auth/v1/logout")?;
            self.send(|http| http.post(url.clone()), Attempts::Once)
                .await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "Sign-out request failed; clearing local session");
        }
        self.session().set(None);
        tracing::info!("Signed out");
    }
}
