use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonVideo {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub module: Option<String>,
    pub url: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct AddVideoPayload {
    #[validate(length(min = 1, max = 256, message = "Title must be 1-256 characters"))]
    pub title: String,
    pub module: Option<String>,
    #[validate(url(message = "Video link must be a URL"))]
    pub url: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}
