//! Shared test utilities and fixtures
//!
//! Mock backend routes and canned rows for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lokitos_backend::retry::RetryConfig;
use lokitos_backend::{AnonKey, BackendClient, BackendConfig};

pub const VIEWER: &str = "viewer-1";

/// Client for a mock server: plain http allowed, near-instant retries.
pub fn client(server: &MockServer) -> BackendClient {
    let config = BackendConfig::new(&server.uri(), AnonKey::new("anon-key"))
        .unwrap()
        .with_require_https(false)
        .with_retry(RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
        });
    BackendClient::new(config).unwrap()
}

/// Mount the password grant and sign `client` in as [`VIEWER`].
pub async fn sign_in(server: &MockServer, client: &BackendClient) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-abc",
            "user": {"id": VIEWER}
        })))
        .mount(server)
        .await;
    client.sign_in("hincha@example.com", "secreto").await.unwrap();
}

pub fn author() -> Value {
    json!({"id": "u1", "handle": "riquelme", "display_name": "Román"})
}

pub fn post_row(id: &str) -> Value {
    json!({
        "id": id,
        "author": author(),
        "content": format!("post {id}"),
        "created_at": "2024-05-01T12:00:00Z",
        "likes_count": 3,
        "views_count": 10
    })
}

pub fn video_row(id: &str) -> Value {
    json!({
        "id": id,
        "author": author(),
        "video_url": format!("https://cdn.example/{id}.mp4"),
        "caption": format!("video {id}"),
        "created_at": "2024-05-01T12:00:00Z"
    })
}

pub fn rows(make: fn(&str) -> Value, prefix: &str, start: usize, count: usize) -> Value {
    Value::Array(
        (start..start + count)
            .map(|n| make(&format!("{prefix}{n}")))
            .collect(),
    )
}

/// Accept any view registration.
pub async fn mount_register_view(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/register_view"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}
