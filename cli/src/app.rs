//! Headless navigation over the backend: each route prints what its screen would show.

use std::io::Write;

use anyhow::{Context, Result};

use lokitos_backend::{BackendClient, PageProvider, RemoteFeed};
use lokitos_core::{
    FeedBuffer, LoadOutcome, Playable, PlaybackCoordinator, ScrollMemory, ScrollMetrics,
    ToastQueue,
};
use lokitos_types::{FeedItem, ItemId, Post, Profile, Route, Video, excerpt};

use crate::settings::Settings;

const SUMMARY_CHARS: usize = 80;
const PROFILE_LIST_LIMIT: usize = 50;
/// The headless screen shows one row at a time.
const VIEWPORT_ROWS: f64 = 1.0;

/// Stand-in for a video element: playback only shows up in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalPlayer {
    item: ItemId,
    url: String,
}

impl Playable for TerminalPlayer {
    fn play(&self) {
        tracing::info!(item_id = %self.item, url = %self.url, "Playing");
    }

    fn pause(&self) {
        tracing::info!(item_id = %self.item, "Paused");
    }
}

/// How a feed item is printed, and the player it needs, if any.
pub trait Summary: FeedItem {
    fn summary(&self) -> String;

    fn player(&self) -> Option<TerminalPlayer>;
}

impl Summary for Post {
    fn summary(&self) -> String {
        let media = self
            .media_kind
            .map(|kind| format!(" [{kind}]"))
            .unwrap_or_default();
        format!(
            "{} · {}{media}  ♥ {} ✕ {} 💬 {} 👁 {}",
            self.author.label(),
            excerpt(&self.content, SUMMARY_CHARS),
            self.votes.likes_count,
            self.votes.dislikes_count,
            self.comments_count,
            self.views_count,
        )
    }

    fn player(&self) -> Option<TerminalPlayer> {
        let url = self.media_url.as_ref()?;
        (self.media_kind == Some(lokitos_types::MediaKind::Video)).then(|| TerminalPlayer {
            item: self.id.clone(),
            url: url.clone(),
        })
    }
}

impl Summary for Video {
    fn summary(&self) -> String {
        format!(
            "▶ {} · {}  ♥ {} 👁 {}",
            self.author.label(),
            excerpt(&self.caption, SUMMARY_CHARS),
            self.votes.likes_count,
            self.views_count,
        )
    }

    fn player(&self) -> Option<TerminalPlayer> {
        Some(TerminalPlayer {
            item: self.id.clone(),
            url: self.video_url.clone(),
        })
    }
}

pub struct App<W: Write> {
    client: BackendClient,
    posts: FeedBuffer<RemoteFeed<Post>, TerminalPlayer>,
    videos: FeedBuffer<RemoteFeed<Video>, TerminalPlayer>,
    playback: PlaybackCoordinator<TerminalPlayer>,
    scroll: ScrollMemory,
    toasts: ToastQueue,
    /// Items to step through per feed screen.
    steps: usize,
    out: W,
}

impl<W: Write> App<W> {
    pub fn new(client: BackendClient, settings: &Settings, steps: usize, out: W) -> Self {
        Self {
            posts: FeedBuffer::new(client.post_feed(), settings.posts),
            videos: FeedBuffer::new(client.video_feed(), settings.videos),
            client,
            playback: PlaybackCoordinator::new(),
            scroll: ScrollMemory::new(settings.scroll_memory_capacity),
            toasts: ToastQueue::new(),
            steps,
            out,
        }
    }

    /// Sign in and attach the viewer to both feeds. A rejected login is
    /// shown as a toast and the session continues anonymously.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<()> {
        match self.client.sign_in(email, password).await {
            Ok(viewer) => {
                self.posts.set_viewer(Some(viewer.clone()));
                self.videos.set_viewer(Some(viewer.clone()));
                writeln!(self.out, "Sesión iniciada ({viewer})")?;
            }
            Err(e) => {
                self.toasts.push_error(&e);
            }
        }
        self.flush_toasts()
    }

    /// End the session. Views counted so far are delivered first, while they
    /// still carry the viewer's token. Without a session only the flush runs.
    pub async fn sign_out(&mut self) {
        self.posts.flush_views().await;
        self.videos.flush_views().await;
        self.client.sign_out().await;
        self.posts.set_viewer(None);
        self.videos.set_viewer(None);
        self.playback.stop();
    }

    /// Show one route. Backend failures become toasts; only output errors abort.
    pub async fn open(&mut self, route: &Route) -> Result<()> {
        writeln!(self.out, "== {route}")?;
        let result = match route {
            Route::ForYou => self.show_home(route).await,
            Route::Video(id) => self.show_videos(route, id.clone()).await,
            Route::Post(id) => self.show_post(id).await,
            Route::Profile(handle) => self.show_profile(handle).await,
            Route::Followers(handle) => {
                let list = self.client.followers(handle).await;
                self.print_profiles(list)
            }
            Route::Following(handle) => {
                let list = self.client.following(handle).await;
                self.print_profiles(list)
            }
            Route::Auth => {
                let state = match self.client.current_viewer() {
                    Some(viewer) => format!("Sesión activa: {viewer}"),
                    None => "Sin sesión. Definí LOKITOS_EMAIL y LOKITOS_PASSWORD.".to_string(),
                };
                writeln!(self.out, "{state}")?;
                Ok(())
            }
        };
        self.flush_toasts()?;
        result
    }

    pub async fn show_notifications(&mut self, limit: usize) -> Result<()> {
        writeln!(self.out, "== notificaciones")?;
        match self.client.notifications(limit).await {
            Ok(list) => {
                let unread = lokitos_types::unread_count(&list);
                writeln!(self.out, "{unread} sin leer")?;
                for n in &list {
                    let marker = if n.read { ' ' } else { '•' };
                    writeln!(self.out, "{marker} {}  → {}", n.message(), n.target())?;
                }
                if unread > 0
                    && let Err(e) = self.client.mark_notifications_read().await
                {
                    self.toasts.push_error(&e);
                }
            }
            Err(e) => {
                self.toasts.push_error(&e);
            }
        }
        self.flush_toasts()
    }

    async fn show_home(&mut self, route: &Route) -> Result<()> {
        let start = self.restore_index(route);
        if self.posts.window().is_empty() {
            let page = self.posts.window().policy().load_batch;
            if let Err(e) = self.posts.initialize(page, None).await {
                self.toasts.push_feed_error(&e);
                return Ok(());
            }
        }
        let last = walk(
            &mut self.posts,
            &mut self.playback,
            &mut self.toasts,
            &mut self.out,
            start,
            self.steps,
        )
        .await?;
        self.scroll.save(route, index_offset(last));
        Ok(())
    }

    async fn show_videos(&mut self, route: &Route, anchor: ItemId) -> Result<()> {
        let start = match self.videos.window().position(&anchor) {
            Some(index) => index,
            None => {
                for handle in self.videos.teardown() {
                    self.playback.release(&handle);
                }
                let page = self.videos.window().policy().load_batch;
                if let Err(e) = self.videos.initialize(page, Some(anchor)).await {
                    self.toasts.push_feed_error(&e);
                    return Ok(());
                }
                self.videos.window().active_index()
            }
        };
        let last = walk(
            &mut self.videos,
            &mut self.playback,
            &mut self.toasts,
            &mut self.out,
            start,
            self.steps,
        )
        .await?;
        self.scroll.save(route, index_offset(last));
        Ok(())
    }

    async fn show_post(&mut self, id: &ItemId) -> Result<()> {
        let post = match self.client.get_post(id).await {
            Ok(post) => post,
            Err(e) => {
                self.toasts.push_error(&e);
                return Ok(());
            }
        };
        writeln!(self.out, "{}", post.summary())?;
        writeln!(self.out, "{}", post.content)?;

        match self.client.comment_tree(id).await {
            Ok(thread) => {
                writeln!(self.out, "-- {} comentarios", thread.len())?;
                for (depth, comment) in thread.depth_first() {
                    writeln!(
                        self.out,
                        "{}{}: {}",
                        "  ".repeat(depth + 1),
                        comment.author.label(),
                        comment.content
                    )?;
                }
            }
            Err(e) => {
                self.toasts.push_error(&e);
            }
        }
        Ok(())
    }

    async fn show_profile(&mut self, handle: &str) -> Result<()> {
        let found = match self.client.search_profiles(handle, 10).await {
            Ok(found) => found,
            Err(e) => {
                self.toasts.push_error(&e);
                return Ok(());
            }
        };
        let Some(profile) = found
            .into_iter()
            .find(|p| p.handle.eq_ignore_ascii_case(handle))
        else {
            writeln!(self.out, "No existe @{handle}")?;
            return Ok(());
        };

        writeln!(self.out, "{} (@{})", profile.label(), profile.handle)?;
        if let Some(bio) = &profile.bio {
            writeln!(self.out, "{bio}")?;
        }
        match self.client.profile_stats(&profile.id).await {
            Ok(stats) => writeln!(
                self.out,
                "{} publicaciones · {} seguidores · {} seguidos",
                stats.posts_count, stats.followers_count, stats.following_count
            )?,
            Err(e) => {
                self.toasts.push_error(&e);
            }
        }
        if self.client.current_viewer().is_some() {
            match self.client.is_following(&profile.id).await {
                Ok(true) => writeln!(self.out, "Lo seguís")?,
                Ok(false) => {}
                Err(e) => {
                    self.toasts.push_error(&e);
                }
            }
        }
        Ok(())
    }

    fn print_profiles(
        &mut self,
        list: Result<Vec<Profile>, lokitos_backend::BackendError>,
    ) -> Result<()> {
        match list {
            Ok(list) => {
                for profile in list.iter().take(PROFILE_LIST_LIMIT) {
                    writeln!(self.out, "{} (@{})", profile.label(), profile.handle)?;
                }
                if list.is_empty() {
                    writeln!(self.out, "Nadie por acá todavía")?;
                }
            }
            Err(e) => {
                self.toasts.push_error(&e);
            }
        }
        Ok(())
    }

    fn restore_index(&mut self, route: &Route) -> usize {
        let len = self.posts.window().len();
        self.scroll
            .restore(route)
            .map(offset_index)
            .filter(|&index| index < len)
            .unwrap_or(0)
    }

    fn flush_toasts(&mut self) -> Result<()> {
        for toast in self.toasts.drain() {
            let repeat = if toast.count > 1 {
                format!(" (x{})", toast.count)
            } else {
                String::new()
            };
            writeln!(self.out, "[{:?}] {}{repeat}", toast.severity, toast.message)?;
        }
        Ok(())
    }
}

/// Scroll memory stores offsets; the headless screens scroll one item per row.
#[allow(clippy::cast_precision_loss)]
fn index_offset(index: usize) -> f64 {
    index as f64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn offset_index(offset: f64) -> usize {
    offset as usize
}

/// Headless layout of a feed: one row per item, positioned on `index`.
fn row_metrics(index: usize, len: usize) -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: index_offset(index),
        scroll_height: index_offset(len),
        viewport_height: VIEWPORT_ROWS,
    }
}

/// Step through up to `steps` items starting at `start`, like a reader
/// swiping down. Returns the index the reader stopped on.
async fn walk<P, W>(
    buffer: &mut FeedBuffer<P, TerminalPlayer>,
    playback: &mut PlaybackCoordinator<TerminalPlayer>,
    toasts: &mut ToastQueue,
    out: &mut W,
    start: usize,
    steps: usize,
) -> Result<usize>
where
    P: PageProvider + Clone + Send + Sync + 'static,
    P::Item: Summary,
    W: Write,
{
    let mut index = start;
    for _ in 0..steps {
        let len = buffer.window().len();
        if index >= len {
            break;
        }
        buffer.record_scroll(row_metrics(index, len));
        match buffer.on_viewport_index_changed(index).await {
            Ok(LoadOutcome::Loaded {
                eviction: Some(eviction),
                ..
            }) => {
                let window = buffer.window();
                let scroll_top =
                    eviction.restore_scroll(row_metrics(window.active_index(), window.len()));
                tracing::debug!(evicted = eviction.count, scroll_top, "Window trimmed");
                for handle in &eviction.handles {
                    playback.release(handle);
                }
            }
            Ok(_) => {}
            Err(e) => {
                toasts.push_feed_error(&e);
            }
        }

        let active = buffer.window().active_index();
        let Some(item) = buffer.window().active_item() else {
            break;
        };
        writeln!(out, "{:>3} {}", active, item.summary()).context("writing output")?;

        if let Some(player) = item.player() {
            buffer.window_mut().attach_handle(active, player.clone())?;
            playback.request_play(player);
        }
        index = active + 1;
    }
    Ok(buffer.window().active_index())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use lokitos_backend::{AnonKey, BackendClient, BackendConfig};
    use lokitos_core::{BufferPolicy, ScrollRatio};
    use lokitos_types::{ItemId, Route};

    use super::{App, row_metrics};
    use crate::settings::Settings;

    fn settings(server: &MockServer) -> Settings {
        Settings {
            backend: BackendConfig::new(&server.uri(), AnonKey::new("anon-key"))
                .unwrap()
                .with_require_https(false),
            posts: BufferPolicy::POSTS,
            videos: BufferPolicy::VIDEOS,
            scroll_memory_capacity: 8,
        }
    }

    fn video(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "author": {"id": "u1", "handle": "riquelme"},
            "video_url": format!("https://cdn.example/{id}.mp4"),
            "caption": format!("video {id}"),
            "created_at": "2024-05-01T12:00:00Z"
        })
    }

    #[test]
    fn trimmed_rows_keep_relative_position() {
        // Reader on row 15 of 21, six rows trimmed from the head.
        let ratio = ScrollRatio::capture(row_metrics(15, 21));
        assert!((ratio.value() - 0.75).abs() < f64::EPSILON);
        assert!((ratio.restore(row_metrics(0, 15)) - 10.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn sign_out_delivers_views_with_the_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-abc",
                "user": {"id": "viewer-1"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/feed_page"))
            .and(body_partial_json(json!({"offset": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                video("v0"),
                video("v1"),
                video("v2"),
                video("v3"),
                video("v4")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/feed_page"))
            .and(body_partial_json(json!({"offset": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/register_view"))
            .and(header("authorization", "Bearer token-abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(settings(&server).backend).unwrap();
        let mut app = App::new(client, &settings(&server), 2, Vec::new());
        app.sign_in("hincha@example.com", "secreto").await.unwrap();
        app.open(&Route::Video(ItemId::new("v0"))).await.unwrap();
        app.sign_out().await;

        let received = server.received_requests().await.unwrap_or_default();
        let paths: Vec<&str> = received.iter().map(|r| r.url.path()).collect();
        let logout = paths.iter().position(|p| p.ends_with("logout")).unwrap();
        let views: Vec<usize> = paths
            .iter()
            .enumerate()
            .filter(|(_, p)| p.ends_with("register_view"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|&i| i < logout));
    }
}
