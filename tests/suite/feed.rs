//! Feed buffer driven end to end against a mock backend.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lokitos_backend::{PageProvider, RemoteFeed};
use lokitos_core::{BufferPolicy, FeedBuffer, LoadOutcome};
use lokitos_types::{FeedItem, ItemId, Video};

use crate::common::{client, mount_register_view, rows, video_row};

async fn mount_video_page(server: &MockServer, offset: usize, start: usize, count: usize) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/feed_page"))
        .and(body_partial_json(json!({"kind": "videos", "offset": offset})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(video_row, "v", start, count)))
        .expect(1)
        .mount(server)
        .await;
}

fn video_feed(server: &MockServer) -> FeedBuffer<RemoteFeed<Video>> {
    FeedBuffer::new(client(server).video_feed(), BufferPolicy::VIDEOS)
}

fn ids<T: FeedItem>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.id().as_str().to_string()).collect()
}

#[tokio::test]
async fn scrolling_loads_pages_and_trims_the_window() {
    let server = MockServer::start().await;
    mount_register_view(&server).await;
    mount_video_page(&server, 0, 0, 5).await;
    mount_video_page(&server, 5, 5, 5).await;
    mount_video_page(&server, 10, 10, 5).await;
    mount_video_page(&server, 15, 15, 5).await;
    mount_video_page(&server, 20, 20, 2).await;

    let mut feed = video_feed(&server);
    feed.initialize(5, None).await.unwrap();
    assert_eq!(feed.window().len(), 5);

    let mut evicted = 0;
    let mut index = 0;
    while index < feed.window().len() {
        if let LoadOutcome::Loaded {
            eviction: Some(eviction),
            ..
        } = feed.on_viewport_index_changed(index).await.unwrap()
        {
            evicted += eviction.count;
        }
        index = feed.window().active_index() + 1;
    }

    let window = feed.window();
    assert_eq!(evicted, 7);
    assert_eq!(window.len(), BufferPolicy::VIDEOS.buffer_size_max);
    assert_eq!(ids(window.items()).first().map(String::as_str), Some("v7"));
    assert_eq!(ids(window.items()).last().map(String::as_str), Some("v21"));
    assert!(!window.has_more());
    assert_eq!(window.active_index(), window.len() - 1);
    assert_eq!(window.fetch_offset(), 25);
}

#[tokio::test]
async fn deep_link_positions_on_anchor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/feed_page"))
        .and(body_partial_json(json!({"offset": 0, "anchor_id": "v3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(video_row, "v", 1, 5)))
        .expect(1)
        .mount(&server)
        .await;

    let mut feed = video_feed(&server);
    feed.initialize(5, Some(ItemId::new("v3"))).await.unwrap();

    assert_eq!(feed.window().active_index(), 2);
    assert_eq!(
        feed.window().active_item().map(|v| v.caption.as_str()),
        Some("video v3")
    );
}

#[tokio::test]
async fn failed_page_keeps_items_and_can_be_retried() {
    let server = MockServer::start().await;
    mount_register_view(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/feed_page"))
        .and(body_partial_json(json!({"offset": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(video_row, "v", 0, 5)))
        .mount(&server)
        .await;
    // Both attempts of the first load-more fail, the next one succeeds.
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/feed_page"))
        .and(body_partial_json(json!({"offset": 5})))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/feed_page"))
        .and(body_partial_json(json!({"offset": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(video_row, "v", 5, 5)))
        .mount(&server)
        .await;

    let mut feed = video_feed(&server);
    feed.initialize(5, None).await.unwrap();

    let err = feed.on_viewport_index_changed(2).await.unwrap_err();
    assert!(err.backend().is_some_and(|e| e.is_transient()));
    assert_eq!(feed.window().len(), 5);
    assert!(feed.window().has_more());
    assert!(!feed.window().is_loading());

    let outcome = feed.load_more().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { appended: 5, .. }));
    assert_eq!(feed.window().len(), 10);
}

#[tokio::test]
async fn view_is_counted_locally_and_remotely() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/feed_page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(video_row, "v", 0, 5)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/register_view"))
        .and(body_partial_json(json!({"item_id": "v0"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut feed = video_feed(&server);
    feed.initialize(5, None).await.unwrap();
    feed.on_viewport_index_changed(0).await.unwrap();
    assert_eq!(feed.window().items()[0].views_count, 1);

    feed.flush_views().await;
    assert_eq!(feed.pending_views(), 0);
    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.iter().any(|r| r.url.path().ends_with("register_view")));
}

#[tokio::test]
async fn provider_reports_its_kind() {
    let server = MockServer::start().await;
    let backend = client(&server);
    assert_eq!(backend.post_feed().kind().to_string(), "posts");
    assert_eq!(backend.video_feed().kind().to_string(), "videos");
}
