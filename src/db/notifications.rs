use chrono::{DateTime, Utc};

use super::Entity;
use crate::core::{AppError, IdStrategy};
use crate::models::notifications::Notification;
use crate::store::Store;

impl Entity for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_prefix(&self) -> &'static str {
        "notif-"
    }
}

pub async fn append_notification(
    store: &Store,
    notification: Notification,
    strategy: IdStrategy,
    now: DateTime<Utc>,
    retain_latest: Option<usize>,
) -> Result<Notification, AppError> {
    super::insert_bounded(store, notification, strategy, now, retain_latest).await
}

/// Storage (insertion) order.
pub async fn get_notifications(store: &Store) -> Result<Vec<Notification>, AppError> {
    super::list(store).await
}
