use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// `None` addresses everyone.
    pub recipient_id: Option<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub request_id: Option<String>,
}

impl Notification {
    pub fn is_for(&self, recipient_id: &str) -> bool {
        match &self.recipient_id {
            Some(id) => id == recipient_id,
            None => true,
        }
    }
}
