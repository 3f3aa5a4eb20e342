//! Backoff for requests to the backend.
//!
//! Idempotent reads (feed pages, profile lookups) get up to `max_retries`
//! extra attempts on 408, 409, 429 and 5xx, and on connect or timeout
//! failures. Writes that must not double-apply, such as vote toggles and
//! sign-in, run with [`RetryConfig::single_attempt`].
//!
//! Every attempt of one logical request carries the same `Idempotency-Key`
//! (`lokitos-{uuid}`) and an `X-Retry-Count` starting at 0.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use uuid::Uuid;

/// Longest `Retry-After` the client is willing to honor.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Fraction the delay may be shortened by at random (0.25 = up to 25%).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn single_attempt(&self) -> Self {
        Self {
            max_retries: 0,
            ..self.clone()
        }
    }

    /// Wait before retry number `retry` (0-based). The server's `Retry-After`
    /// wins when it is present and sane.
    #[must_use]
    pub fn delay_before(&self, retry: u32, headers: Option<&HeaderMap>) -> Duration {
        if let Some(delay) = headers.and_then(retry_after) {
            return delay;
        }
        let doubled = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay);
        let keep = 1.0 - rand::random::<f64>() * self.jitter_factor.clamp(0.0, 1.0);
        doubled.mul_f64(keep)
    }
}

/// `Retry-After` in whole seconds, if strictly between zero and a minute.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let delay = Duration::from_secs(raw.trim().parse().ok()?);
    (!delay.is_zero() && delay < MAX_RETRY_AFTER).then_some(delay)
}

#[must_use]
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 409 | 429 | 500..=599)
}

/// How a request ended after all the attempts it was allowed.
#[derive(Debug)]
pub enum RetryOutcome {
    Success(Response),
    /// Non-2xx that was either final or still failing on the last attempt.
    HttpError(Response),
    /// Connect or timeout failure on the last attempt.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
    /// Transport failure that retrying would not fix (bad body, redirect loop...).
    NonRetryable(reqwest::Error),
}

/// Send the request built by `build`, once per attempt.
pub async fn send_with_retry<F>(build: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let key = format!("lokitos-{}", Uuid::new_v4());
    let mut retry = 0u32;

    loop {
        let last = retry >= config.max_retries;
        let sent = build()
            .header("X-Retry-Count", retry.to_string())
            .header("Idempotency-Key", &key)
            .send()
            .await;

        let delay = match sent {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                let status = response.status();
                if last || !is_retryable_status(status) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = config.delay_before(retry, Some(response.headers()));
                tracing::debug!(
                    %status,
                    retry = retry + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying after status"
                );
                delay
            }
            Err(e) if !(e.is_connect() || e.is_timeout()) => {
                return RetryOutcome::NonRetryable(e);
            }
            Err(e) if last => {
                return RetryOutcome::ConnectionError {
                    attempts: retry + 1,
                    source: e,
                };
            }
            Err(e) => {
                let delay = config.delay_before(retry, None);
                tracing::debug!(
                    error = %e,
                    retry = retry + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying after connection error"
                );
                delay
            }
        };

        tokio::time::sleep(delay).await;
        retry += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use reqwest::StatusCode;
    use reqwest::header::{HeaderMap, HeaderValue};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::{RetryConfig, RetryOutcome, is_retryable_status, retry_after, send_with_retry};

    fn quick() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            jitter_factor: 0.0,
        }
    }

    fn headers(retry_after: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_bytes(retry_after.as_bytes()).unwrap(),
        );
        headers
    }

    #[test]
    fn retry_after_window() {
        assert_eq!(retry_after(&headers("2")), Some(Duration::from_secs(2)));
        assert_eq!(retry_after(&headers("0")), None);
        assert_eq!(retry_after(&headers("90")), None);
        assert_eq!(retry_after(&headers("mañana")), None);
    }

    #[test]
    fn delay_doubles_and_caps() {
        let config = RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_before(0, None), Duration::from_millis(300));
        assert_eq!(config.delay_before(1, None), Duration::from_millis(600));
        assert_eq!(config.delay_before(12, None), config.max_delay);
        assert_eq!(
            config.delay_before(0, Some(&headers("4"))),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn jitter_only_shortens() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let delay = config.delay_before(0, None);
            assert!(delay >= Duration::from_millis(225) && delay <= Duration::from_millis(300));
        }
    }

    #[test]
    fn client_errors_are_final() {
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[tokio::test]
    async fn feed_page_recovers_from_one_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/feed_page"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/feed_page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = format!("{}/rest/v1/rpc/feed_page", server.uri());
        let outcome = send_with_retry(|| http.post(&url), &quick()).await;
        assert!(matches!(outcome, RetryOutcome::Success(_)));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = format!("{}/rest/v1/profiles", server.uri());
        match send_with_retry(|| http.get(&url), &quick()).await {
            RetryOutcome::HttpError(response) => {
                assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn vote_toggle_is_sent_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/toggle_vote"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = format!("{}/rest/v1/rpc/toggle_vote", server.uri());
        let outcome = send_with_retry(|| http.post(&url), &quick().single_attempt()).await;
        assert!(matches!(outcome, RetryOutcome::HttpError(_)));
    }

    #[tokio::test]
    async fn attempts_share_one_idempotency_key() {
        let server = MockServer::start().await;
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
        let log = Arc::clone(&seen);

        Mock::given(method("GET"))
            .and(path("/rest/v1/comments"))
            .respond_with(move |req: &Request| {
                let value = |name: &str| {
                    req.headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                let mut log = log.lock().unwrap();
                log.push((value("Idempotency-Key"), value("X-Retry-Count")));
                if log.len() < 3 {
                    ResponseTemplate::new(429)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = format!("{}/rest/v1/comments", server.uri());
        let outcome = send_with_retry(|| http.get(&url), &quick()).await;
        assert!(matches!(outcome, RetryOutcome::Success(_)));

        let seen = seen.lock().unwrap();
        assert!(seen[0].0.starts_with("lokitos-"));
        assert!(seen.iter().all(|(key, _)| *key == seen[0].0));
        let counts: Vec<&str> = seen.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(counts, ["0", "1", "2"]);
    }
}
