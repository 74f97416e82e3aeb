use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session note written by the provider when closing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub request_id: String,
    pub author_id: String,
    pub student_id: String,
    pub summary: String,
    pub topics: Option<String>,
    #[serde(alias = "followup")]
    pub follow_up: Option<String>,
    pub date: DateTime<Utc>,
}
