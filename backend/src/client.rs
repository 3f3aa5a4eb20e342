use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use lokitos_types::UserId;

use crate::retry::{self, RetryConfig, RetryOutcome};
use crate::{BackendError, SessionStore, read_capped_error_body};

const CONNECT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Public (anonymous) project key sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct AnonKey(String);

impl AnonKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

// Manual Debug impl to prevent leaking the key in logs.
impl fmt::Debug for AnonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AnonKey([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    base_url: Url,
    anon_key: AnonKey,
    timeout: Duration,
    require_https: bool,
    retry: RetryConfig,
}

impl BackendConfig {
    pub fn new(base_url: &str, anon_key: AnonKey) -> Result<Self, BackendError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            anon_key,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            require_https: true,
            retry: RetryConfig::default(),
        })
    }

    /// Plain `http://` is only accepted when this is turned off (local development, tests).
    #[must_use]
    pub fn with_require_https(mut self, require: bool) -> Self {
        self.require_https = require;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}

/// Whether a request may be sent more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempts {
    /// Idempotent: reads, deletes, updates by filter.
    Retry,
    /// Toggles, inserts and counters: a duplicate would change state twice.
    Once,
}

/// Authenticated client for the hosted backend.
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: Arc<BackendConfig>,
    session: Arc<SessionStore>,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        if config.require_https && config.base_url.scheme() != "https" {
            return Err(BackendError::InsecureUrl(config.base_url.to_string()));
        }
        let http = client_builder(&config)?.build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            session: Arc::new(SessionStore::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn current_viewer(&self) -> Option<UserId> {
        self.session.current_viewer()
    }

    pub(crate) fn require_viewer(&self) -> Result<UserId, BackendError> {
        self.current_viewer().ok_or(BackendError::NotSignedIn)
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.config.base_url.join(path)?)
    }

    pub(crate) fn table_url(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&format!("/rest/v1/{table}"))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn bearer_token(&self) -> String {
        self.session
            .access_token()
            .unwrap_or_else(|| self.config.anon_key.expose_secret().to_string())
    }

    /// Send a request built by `build`, mapping every non-2xx outcome to an error.
    pub(crate) async fn send<F>(
        &self,
        build: F,
        attempts: Attempts,
    ) -> Result<Response, BackendError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let token = self.bearer_token();
        let retry_config = match attempts {
            Attempts::Retry => self.config.retry.clone(),
            Attempts::Once => self.config.retry.single_attempt(),
        };

        let outcome =
            retry::send_with_retry(|| build(&self.http).bearer_auth(&token), &retry_config).await;

        match outcome {
            RetryOutcome::Success(response) => Ok(response),
            RetryOutcome::HttpError(response) => {
                let status = response.status();
                let url = response.url().path().to_string();
                let body = read_capped_error_body(response).await;
                tracing::warn!(%status, path = %url, "Backend request failed");
                Err(BackendError::Http { status, body })
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                Err(BackendError::Connection { attempts, source })
            }
            RetryOutcome::NonRetryable(e) => Err(BackendError::Transport(e)),
        }
    }

    pub(crate) async fn rpc<A, T>(
        &self,
        function: &str,
        args: &A,
        attempts: Attempts,
    ) -> Result<T, BackendError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("/rest/v1/rpc/{function}"))?;
        let response = self
            .send(|http| http.post(url.clone()).json(args), attempts)
            .await?;
        decode(response).await
    }

    /// RPC whose response body is irrelevant.
    pub(crate) async fn rpc_unit<A>(
        &self,
        function: &str,
        args: &A,
        attempts: Attempts,
    ) -> Result<(), BackendError>
    where
        A: Serialize + ?Sized,
    {
        let url = self.endpoint(&format!("/rest/v1/rpc/{function}"))?;
        self.send(|http| http.post(url.clone()).json(args), attempts)
            .await?;
        Ok(())
    }

    pub(crate) async fn select<T>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = self.table_url(table, params)?;
        let response = self
            .send(|http| http.get(url.clone()), Attempts::Retry)
            .await?;
        decode(response).await
    }

    /// Insert one row and return it as stored (with defaults and embeds filled in).
    pub(crate) async fn insert<B, T>(
        &self,
        table: &str,
        select: &str,
        row: &B,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &[("select", select.to_string())])?;
        let response = self
            .send(
                |http| {
                    http.post(url.clone())
                        .header("Prefer", "return=representation")
                        .json(row)
                },
                Attempts::Once,
            )
            .await?;
        let rows: Vec<T> = decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("inserted {table} row")))
    }

    /// Insert one row, ignoring conflicts with an existing identical row.
    pub(crate) async fn insert_ignoring_duplicates<B>(
        &self,
        table: &str,
        row: &B,
    ) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, &[])?;
        self.send(
            |http| {
                http.post(url.clone())
                    .header("Prefer", "return=minimal,resolution=ignore-duplicates")
                    .json(row)
            },
            Attempts::Retry,
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn delete_where(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<(), BackendError> {
        let url = self.table_url(table, filters)?;
        self.send(|http| http.delete(url.clone()), Attempts::Retry)
            .await?;
        Ok(())
    }

    pub(crate) async fn update_where<B>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        patch: &B,
    ) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, filters)?;
        self.send(|http| http.patch(url.clone()).json(patch), Attempts::Retry)
            .await?;
        Ok(())
    }
}

/// PostgREST equality filter value.
pub(crate) fn eq(value: impl fmt::Display) -> String {
    format!("eq.{value}")
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn client_builder(config: &BackendConfig) -> Result<reqwest::ClientBuilder, BackendError> {
    let mut default_headers = HeaderMap::new();
    let mut apikey = HeaderValue::from_str(config.anon_key.expose_secret())
        .map_err(|_| BackendError::InvalidAnonKey)?;
    apikey.set_sensitive(true);
    default_headers.insert("apikey", apikey);
    default_headers.insert(
        "X-Client-Info",
        HeaderValue::from_static(concat!("lokitos-rust/", env!("CARGO_PKG_VERSION"))),
    );

    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::none())
        .https_only(config.require_https)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers))
}
