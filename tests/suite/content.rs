//! Creating, voting on and deleting posts, with the feed kept in sync.

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lokitos_backend::{BackendError, RemoteFeed};
use lokitos_core::{BufferPolicy, FeedBuffer, ToastQueue};
use lokitos_types::{
    DraftError, FeedItem, ItemId, MediaFile, MediaValidationError, Post, PostDraft, UserVote,
    VoteKind,
};

use crate::common::{VIEWER, client, post_row, rows, sign_in};

async fn home_feed(server: &MockServer) -> FeedBuffer<RemoteFeed<Post>> {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/feed_page"))
        .and(body_partial_json(json!({"kind": "posts", "offset": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(post_row, "p", 0, 3)))
        .mount(server)
        .await;
    let mut feed = FeedBuffer::new(client(server).post_feed(), BufferPolicy::POSTS);
    feed.initialize(10, None).await.unwrap();
    feed
}

#[tokio::test]
async fn oversized_image_never_reaches_the_server() {
    let server = MockServer::start().await;
    let image = MediaFile::new("tribuna.png", "image/png", vec![0; 8 * 1024 * 1024]);

    let err = PostDraft::new("mirá esto", Some(image)).unwrap_err();

    assert!(matches!(
        err,
        DraftError::Media(MediaValidationError::TooLarge { .. })
    ));
    assert!(err.to_string().contains("5 MB"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn new_post_goes_to_the_top_of_the_feed() {
    let server = MockServer::start().await;
    let mut feed = home_feed(&server).await;
    let backend = client(&server);
    sign_in(&server, &backend).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/posts"))
        .and(body_json(json!({"author_id": VIEWER, "content": "Aguante"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([post_row("p-new")])))
        .expect(1)
        .mount(&server)
        .await;

    let post = backend
        .create_post(PostDraft::new("  Aguante ", None).unwrap())
        .await
        .unwrap();
    feed.prepend_item(post);

    let first = feed.window().items()[0].id().clone();
    assert_eq!(first, ItemId::new("p-new"));
    assert_eq!(feed.window().len(), 4);
}

#[tokio::test]
async fn vote_toggle_updates_the_card() {
    let server = MockServer::start().await;
    let mut feed = home_feed(&server).await;
    let backend = client(&server);
    sign_in(&server, &backend).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/toggle_vote"))
        .and(body_json(json!({
            "item_id": "p1",
            "viewer_id": VIEWER,
            "vote_kind": "like"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "likes_count": 4,
            "dislikes_count": 0,
            "user_vote": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = ItemId::new("p1");
    let before = feed.window().items()[1].votes;
    assert_eq!(before.toggled(VoteKind::Like).likes_count, 4);

    let tally = backend.vote(&id, VoteKind::Like).await.unwrap();
    assert!(feed.window_mut().update_item(&id, |post| post.votes = tally));

    let votes = feed.window().items()[1].votes;
    assert_eq!(votes.likes_count, 4);
    assert_eq!(votes.user_vote, UserVote::Liked);
}

#[tokio::test]
async fn vote_requires_a_session() {
    let server = MockServer::start().await;
    let err = client(&server)
        .vote(&ItemId::new("p1"), VoteKind::Dislike)
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::NotSignedIn));
    let mut toasts = ToastQueue::new();
    toasts.push_error(&err);
    assert!(toasts.iter().next().unwrap().message.contains("Iniciá sesión"));
}

#[tokio::test]
async fn delete_cascades_then_drops_the_card() {
    let server = MockServer::start().await;
    let mut feed = home_feed(&server).await;
    let backend = client(&server);
    sign_in(&server, &backend).await;

    for table in ["votes", "views"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/rest/v1/{table}")))
            .and(query_param("post_id", "eq.p2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/comments"))
        .respond_with(ResponseTemplate::new(403).set_body_string("rls"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/posts"))
        .and(query_param("id", "eq.p2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let id = ItemId::new("p2");
    let report = backend.delete_post(&id).await.unwrap();
    assert_eq!(report.failed_dependents, ["comments"]);
    assert!(!report.is_clean());

    let (removed, handle) = feed.remove_item(&id).unwrap();
    assert_eq!(removed.id, id);
    assert!(handle.is_none());
    assert!(feed.window().position(&id).is_none());
    assert_eq!(feed.window().len(), 2);
}
