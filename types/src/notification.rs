//! Activity notifications shown in the bell menu.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Dislike,
    Comment,
    Reply,
    Follow,
    Mention,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: ItemId,
    pub kind: NotificationKind,
    pub actor_handle: String,
    #[serde(default)]
    pub post_id: Option<ItemId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    #[must_use]
    pub fn message(&self) -> String {
        let actor = &self.actor_handle;
        match self.kind {
            NotificationKind::Like => format!("@{actor} le dio like a tu publicación"),
            NotificationKind::Dislike => format!("@{actor} le dio dislike a tu publicación"),
            NotificationKind::Comment => format!("@{actor} comentó tu publicación"),
            NotificationKind::Reply => format!("@{actor} respondió a tu comentario"),
            NotificationKind::Follow => format!("@{actor} empezó a seguirte"),
            NotificationKind::Mention => format!("@{actor} te mencionó en una publicación"),
        }
    }

    /// Where tapping the notification navigates.
    #[must_use]
    pub fn target(&self) -> Route {
        match (&self.kind, &self.post_id) {
            (NotificationKind::Follow, _) | (_, None) => Route::Profile(self.actor_handle.clone()),
            (_, Some(post)) => Route::Post(post.clone()),
        }
    }
}

#[must_use]
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}
