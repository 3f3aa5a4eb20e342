use serde::Serialize;

use lokitos_types::Notification;

use crate::BackendError;
use crate::client::{BackendClient, eq};

#[derive(Serialize)]
struct MarkRead {
    read: bool,
}

impl BackendClient {
    /// Most recent notifications for the viewer, newest first.
    pub async fn notifications(&self, limit: usize) -> Result<Vec<Notification>, BackendError> {
        let viewer = self.require_viewer()?;
        self.select(
            "notifications",
            &[
                ("recipient_id", eq(&viewer)),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn mark_notifications_read(&self) -> Result<(), BackendError> {
        let viewer = self.require_viewer()?;
        self.update_where(
            "notifications",
            &[("recipient_id", eq(&viewer)), ("read", "eq.false".to_string())],
            &MarkRead { read: true },
        )
        .await
    }
}
