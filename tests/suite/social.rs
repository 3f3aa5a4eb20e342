//! Session lifecycle and the follow graph.

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lokitos_backend::BackendError;
use lokitos_types::{Notification, Route, UserId, unread_count};

use crate::common::{VIEWER, author, client, sign_in};

#[tokio::test]
async fn follow_then_check() {
    let server = MockServer::start().await;
    let backend = client(&server);
    sign_in(&server, &backend).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/follows"))
        .and(body_json(json!({"follower_id": VIEWER, "following_id": "u1"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/follows"))
        .and(query_param("following_id", "eq.u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"follower_id": VIEWER}])))
        .mount(&server)
        .await;

    let target = UserId::new("u1");
    backend.follow(&target).await.unwrap();
    assert!(backend.is_following(&target).await.unwrap());

    let err = backend.follow(&UserId::new(VIEWER)).await.unwrap_err();
    assert!(matches!(err, BackendError::SelfFollow));
}

#[tokio::test]
async fn signed_out_viewer_follows_nobody() {
    let server = MockServer::start().await;
    let backend = client(&server);
    sign_in(&server, &backend).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut changes = backend.session().subscribe();
    backend.sign_out().await;

    assert!(changes.has_changed().unwrap());
    assert!(changes.borrow_and_update().is_none());
    assert!(!backend.is_following(&UserId::new("u1")).await.unwrap());
}

#[tokio::test]
async fn profile_lookup_and_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("handle", "ilike.*riquelme*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([author()])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/profile_stats"))
        .and(body_json(json!({"profile_id": "u1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts_count": 10,
            "followers_count": 1997,
            "following_count": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server);
    let found = backend.search_profiles("(riquelme*)", 5).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].label(), "Román");

    let stats = backend.profile_stats(&found[0].id).await.unwrap();
    assert_eq!(stats.followers_count, 1997);
}

#[tokio::test]
async fn notifications_link_back_to_content() {
    let server = MockServer::start().await;
    let backend = client(&server);
    sign_in(&server, &backend).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("recipient_id", format!("eq.{VIEWER}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "n1",
                "kind": "comment",
                "actor_handle": "palermo",
                "post_id": "p7",
                "created_at": "2024-05-02T10:00:00Z",
                "read": false
            },
            {
                "id": "n2",
                "kind": "follow",
                "actor_handle": "bianchi",
                "created_at": "2024-05-01T10:00:00Z",
                "read": true
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let list: Vec<Notification> = backend.notifications(20).await.unwrap();
    assert_eq!(unread_count(&list), 1);
    assert_eq!(list[0].target(), Route::parse("/post/p7").unwrap());
    assert_eq!(list[1].target(), Route::Profile("bianchi".to_string()));
}
