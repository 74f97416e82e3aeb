use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::profiles::{Category, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionMode {
    #[default]
    Online,
    #[serde(rename = "In-person", alias = "InPerson")]
    InPerson,
}

/// Persisted status of a request.
///
/// ```text
/// Pending ──► Approved ──► Completed
///    │  ╲        ▲
///    │   ╲       │
///    │    ► Suggested ◄─┐ (re-proposal)
///    │         │  └─────┘
///    ▼         ▼
/// Declined ◄───┘
/// ```
///
/// `Ignored` is never stored; see [`DisplayStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    #[serde(alias = "Ignored")]
    Pending,
    Approved,
    #[serde(alias = "Rejected")]
    Declined,
    #[serde(alias = "Rescheduled")]
    Suggested,
    Completed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Declined)
    }

    /// Statuses a provider still has to (re)decide on.
    pub fn awaits_decision(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Suggested)
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match (self, next) {
            (Pending | Suggested, Approved | Declined | Suggested) => true,
            (Approved, Completed) => true,
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Declined => "Declined",
            RequestStatus::Suggested => "Suggested",
            RequestStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Status as shown on admin views, with staleness folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayStatus {
    Pending,
    Approved,
    Declined,
    Suggested,
    Completed,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Tutoring,
    Counselling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    pub provider_id: String,
    #[serde(default)]
    pub provider_name: String,
    pub provider_role: Option<Role>,
    #[serde(default, alias = "type")]
    pub category: Category,
    pub module: Option<String>,
    #[serde(default)]
    pub mode: SessionMode,
    /// Slot requested by the student; absent for urgent requests.
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub urgent: bool,
    pub note: Option<String>,
    pub university: Option<String>,
    pub suggested_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: RequestStatus,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(alias = "respondedAt")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub meeting_link: Option<String>,
    pub location: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub rated_at: Option<DateTime<Utc>>,
}

impl Request {
    /// Creation time, falling back to the requested slot for legacy rows.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.datetime)
    }

    pub fn is_stale(&self, as_of: DateTime<Utc>, staleness: Duration) -> bool {
        self.status == RequestStatus::Pending
            && self
                .timestamp()
                .map(|created| as_of - created > staleness)
                .unwrap_or(false)
    }

    pub fn display_status(&self, as_of: DateTime<Utc>, staleness: Duration) -> DisplayStatus {
        match self.status {
            RequestStatus::Pending if self.is_stale(as_of, staleness) => DisplayStatus::Ignored,
            RequestStatus::Pending => DisplayStatus::Pending,
            RequestStatus::Approved => DisplayStatus::Approved,
            RequestStatus::Declined => DisplayStatus::Declined,
            RequestStatus::Suggested => DisplayStatus::Suggested,
            RequestStatus::Completed => DisplayStatus::Completed,
        }
    }

    pub fn service_kind(&self) -> ServiceKind {
        match self.provider_role {
            Some(Role::Counsellor) => ServiceKind::Counselling,
            _ => ServiceKind::Tutoring,
        }
    }

    pub fn involves(&self, profile_id: &str) -> bool {
        self.student_id == profile_id || self.provider_id == profile_id
    }
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestPayload {
    /// Defaults to the provider's service type.
    pub category: Option<Category>,
    #[validate(length(min = 1, max = 32, message = "Module code must be 1-32 characters"))]
    pub module: Option<String>,
    #[serde(default)]
    pub mode: SessionMode,
    pub datetime: Option<DateTime<Utc>>,
    /// "Need help now": no fixed slot required.
    #[serde(default)]
    pub urgent: bool,
    #[validate(length(max = 2000, message = "Note must be at most 2000 characters"))]
    pub note: Option<String>,
    pub university: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum Decision {
    Approve,
    Decline {
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Suggest {
        suggested_time: DateTime<Utc>,
    },
}

impl Decision {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Decline { .. } => RequestStatus::Declined,
            Decision::Suggest { .. } => RequestStatus::Suggested,
        }
    }
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReportPayload {
    #[validate(length(min = 1, message = "Summary is required"))]
    pub summary: String,
    pub topics: Option<String>,
    #[serde(alias = "followup")]
    pub follow_up: Option<String>,
}

impl SessionReportPayload {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RatingPayload {
    #[validate(range(min = 1, max = 5, message = "Please provide a rating 1-5"))]
    pub rating: u8,
    #[validate(length(max = 1000, message = "Comment must be at most 1000 characters"))]
    pub comment: Option<String>,
}

#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetailsPayload {
    #[validate(url(message = "Meeting link must be a URL"))]
    pub meeting_link: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    pub location: Option<String>,
}

/// Shallow-merge patch; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}
