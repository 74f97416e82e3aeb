use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Denormalized rating, either derived from a rated request or stored
/// standalone (seeded data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub provider_id: String,
    #[serde(default, alias = "studentName")]
    pub rater_name: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Set when derived from a request.
    pub request_id: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRatingPayload {
    pub provider_id: String,
    #[validate(length(min = 1, max = 256, message = "Rater name must be 1-256 characters"))]
    pub rater_name: String,
    #[validate(range(min = 1, max = 5, message = "Please provide a rating 1-5"))]
    pub rating: u8,
    pub comment: Option<String>,
    pub date: Option<DateTime<Utc>>,
}
