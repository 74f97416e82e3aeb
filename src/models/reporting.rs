use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::profiles::{Category, Profile};

/// Partition of a request set. `approved + declined + pending + ignored`
/// always equals `total`; `completed` and `suggested` are sub-counts of
/// `approved` and `pending` respectively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub total: usize,
    pub approved: usize,
    pub declined: usize,
    pub pending: usize,
    pub ignored: usize,
    pub completed: usize,
    pub suggested: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub tutoring: RequestSummary,
    pub counselling: RequestSummary,
    pub combined: RequestSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetrics {
    pub provider_id: String,
    pub provider_name: String,
    /// Mean of `reviewedAt - createdAt` over reviewed requests.
    pub avg_response_time_ms: Option<f64>,
    pub ignored_count: usize,
    pub completed_count: usize,
    pub total_count: usize,
}

/// Inclusive calendar-date window plus optional category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderQuery {
    pub name: Option<String>,
    pub module: Option<String>,
    pub category: Option<Category>,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderListing {
    pub profile: Profile,
    pub average_rating: Option<f64>,
    pub rating_count: usize,
}
