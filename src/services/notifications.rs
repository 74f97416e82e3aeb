use std::sync::Arc;

use crate::core::config::NotificationConfig;
use crate::core::{AppError, Clock, IdStrategy};
use crate::db::notifications;
use crate::models::notifications::Notification;
use crate::store::Store;

/// Append-only message log addressed to profiles (or to everyone).
#[derive(Clone)]
pub struct NotificationRelay {
    store: Store,
    clock: Arc<dyn Clock>,
    id_strategy: IdStrategy,
    retain_latest: Option<usize>,
}

impl NotificationRelay {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        id_strategy: IdStrategy,
        settings: &NotificationConfig,
    ) -> Self {
        Self {
            store,
            clock,
            id_strategy,
            retain_latest: settings.retain_latest,
        }
    }

    #[tracing::instrument(name = "Notify", skip(self, title))]
    pub async fn notify(
        &self,
        recipient_id: &str,
        title: impl Into<String>,
        request_id: Option<&str>,
    ) -> Result<Notification, AppError> {
        self.append(Some(recipient_id.to_string()), title.into(), request_id)
            .await
    }

    #[tracing::instrument(name = "Broadcast", skip(self, title))]
    pub async fn broadcast(&self, title: impl Into<String>) -> Result<Notification, AppError> {
        self.append(None, title.into(), None).await
    }

    async fn append(
        &self,
        recipient_id: Option<String>,
        title: String,
        request_id: Option<&str>,
    ) -> Result<Notification, AppError> {
        let now = self.clock.now();
        let notification = Notification {
            id: String::new(),
            recipient_id,
            title,
            created_at: now,
            request_id: request_id.map(str::to_string),
        };
        notifications::append_notification(
            &self.store,
            notification,
            self.id_strategy,
            now,
            self.retain_latest,
        )
        .await
    }

    /// Notifications addressed to `recipient_id` plus broadcasts, newest
    /// first. Equal timestamps keep the later insertion first.
    pub async fn list_for(&self, recipient_id: &str) -> Result<Vec<Notification>, AppError> {
        let mut items: Vec<Notification> = notifications::get_notifications(&self.store)
            .await?
            .into_iter()
            .filter(|n| n.is_for(recipient_id))
            .collect();
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Everything, in storage order.
    pub async fn list_all(&self) -> Result<Vec<Notification>, AppError> {
        notifications::get_notifications(&self.store).await
    }
}
