//! Request lifecycle: creation, provider decisions, session closure, rating
//! and deletion.
//!
//! Every status change goes through [`requests::transition_request`], which
//! re-reads the request under the namespace lock, validates the move against
//! the stored status and writes a shallow patch. The counterpart of the actor
//! is then told about it through the [`NotificationRelay`]; a failed
//! notification never undoes a persisted transition.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use validator::Validate;

use super::notifications::NotificationRelay;
use crate::core::config::LifecycleConfig;
use crate::core::{AppError, Clock};
use crate::db::{reports, requests};
use crate::models::profiles::{Profile, Role};
use crate::models::reports::Report;
use crate::models::requests::{
    CreateRequestPayload, Decision, RatingPayload, Request, RequestPatch, RequestStatus,
    SessionDetailsPayload, SessionReportPayload,
};
use crate::store::Store;

/// Resolves students, tutors and counsellors by id.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn resolve_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actor {
    Student,
    Provider,
    Admin,
}

/// `at`, but never earlier than the request's creation time.
fn not_before(at: DateTime<Utc>, request: &Request) -> DateTime<Utc> {
    match request.created_at {
        Some(created) if created > at => created,
        _ => at,
    }
}

#[derive(Clone)]
pub struct LifecycleEngine {
    store: Store,
    profiles: Arc<dyn ProfileProvider>,
    notifications: NotificationRelay,
    clock: Arc<dyn Clock>,
    settings: LifecycleConfig,
}

impl LifecycleEngine {
    pub fn new(
        store: Store,
        profiles: Arc<dyn ProfileProvider>,
        notifications: NotificationRelay,
        clock: Arc<dyn Clock>,
        settings: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            profiles,
            notifications,
            clock,
            settings,
        }
    }

    fn actor(&self, request: &Request, actor_id: &str) -> Option<Actor> {
        if actor_id == request.provider_id {
            Some(Actor::Provider)
        } else if self.settings.is_admin(actor_id) {
            Some(Actor::Admin)
        } else if actor_id == request.student_id {
            Some(Actor::Student)
        } else {
            None
        }
    }

    async fn resolve(&self, profile_id: &str, what: &str) -> Result<Profile, AppError> {
        self.profiles
            .resolve_profile(profile_id)
            .await?
            .ok_or_else(|| AppError::validation_error(format!("Unknown {} {}", what, profile_id)))
    }

    /// Delivery is best-effort once the transition is stored.
    async fn tell(&self, recipient_id: &str, title: String, request_id: &str) {
        if let Err(e) = self
            .notifications
            .notify(recipient_id, title, Some(request_id))
            .await
        {
            tracing::error!(
                recipient_id,
                request_id,
                error = %e,
                "failed to deliver notification"
            );
        }
    }

    #[tracing::instrument(name = "Request Session", skip(self, payload))]
    pub async fn request_session(
        &self,
        student_id: &str,
        provider_id: &str,
        payload: CreateRequestPayload,
    ) -> Result<Request, AppError> {
        payload.validate()?;

        let student = self.resolve(student_id, "student").await?;
        if student.role != Role::Student {
            return Err(AppError::validation_error(format!(
                "{} is not a student",
                student_id
            )));
        }
        let provider = self.resolve(provider_id, "provider").await?;
        if !provider.role.is_provider() {
            return Err(AppError::validation_error(format!(
                "{} is not a tutor or counsellor",
                provider_id
            )));
        }
        if student.suspended || provider.suspended {
            return Err(AppError::forbidden_error("Suspended accounts cannot take part in sessions"));
        }
        if payload.datetime.is_none() && !payload.urgent {
            return Err(AppError::validation_error(
                "A date and time is required unless the request is urgent",
            ));
        }

        let now = self.clock.now();
        let request = Request {
            id: String::new(),
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            provider_id: provider.id.clone(),
            provider_name: provider.name.clone(),
            provider_role: Some(provider.role),
            category: payload
                .category
                .or(provider.service_type)
                .unwrap_or_default(),
            module: payload.module,
            mode: payload.mode,
            datetime: payload.datetime,
            urgent: payload.urgent,
            note: payload.note,
            university: payload.university.or(student.university),
            suggested_time: None,
            status: RequestStatus::Pending,
            created_at: Some(now),
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
            meeting_link: None,
            location: None,
            completed_at: None,
            rating: None,
            comment: None,
            rated_at: None,
        };

        let request =
            requests::create_request(&self.store, request, self.settings.id_strategy, now).await?;
        tracing::info!(request_id = %request.id, "session requested");

        let title = if request.urgent {
            format!("Urgent help requested by {}", request.student_name)
        } else {
            format!("New session request from {}", request.student_name)
        };
        self.tell(&request.provider_id, title, &request.id).await;
        Ok(request)
    }

    /// Approve, decline or suggest another time.
    ///
    /// The provider (or an admin) decides on `Pending` and `Suggested`
    /// requests; the student may only answer a suggestion, by approving
    /// (accepting the suggested time) or declining it.
    #[tracing::instrument(name = "Decide Request", skip(self))]
    pub async fn decide(
        &self,
        request_id: &str,
        actor_id: &str,
        decision: Decision,
    ) -> Result<Request, AppError> {
        let now = self.clock.now();
        let mut decided_by = None;

        let request = requests::transition_request(&self.store, request_id, |current| {
            let target = decision.target_status();
            if !current.status.can_transition_to(target) {
                return Err(AppError::illegal_transition(format!(
                    "Cannot {} a request that is {}",
                    match target {
                        RequestStatus::Approved => "approve",
                        RequestStatus::Declined => "decline",
                        _ => "reschedule",
                    },
                    current.status
                )));
            }

            let actor = self
                .actor(current, actor_id)
                .ok_or_else(|| AppError::forbidden_error("Not a participant of this request"))?;
            if actor == Actor::Student
                && (current.status != RequestStatus::Suggested
                    || matches!(decision, Decision::Suggest { .. }))
            {
                return Err(AppError::forbidden_error(
                    "Students can only answer a suggested time",
                ));
            }
            decided_by = Some(actor);

            let at = not_before(now, current);
            let mut patch = RequestPatch {
                status: Some(target),
                ..Default::default()
            };
            if current.status == RequestStatus::Pending {
                patch.reviewed_at = Some(at);
                patch.reviewed_by = Some(actor_id.to_string());
            }

            match &decision {
                Decision::Approve => {
                    if current.status == RequestStatus::Suggested {
                        patch.datetime = current.suggested_time;
                    }
                }
                Decision::Decline { reason } => {
                    let reason = reason
                        .as_deref()
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .unwrap_or(self.settings.default_decline_reason.as_str());
                    patch.rejection_reason = Some(reason.to_string());
                }
                Decision::Suggest { suggested_time } => {
                    patch.suggested_time = Some(*suggested_time);
                }
            }
            Ok(patch)
        })
        .await?;

        tracing::info!(status = %request.status, "request decided");

        let (recipient, title) = match (decided_by, &decision) {
            (Some(Actor::Student), Decision::Approve) => (
                &request.provider_id,
                format!("{} accepted the suggested time", request.student_name),
            ),
            (Some(Actor::Student), _) => (
                &request.provider_id,
                format!("{} declined the suggested time", request.student_name),
            ),
            (_, Decision::Approve) => (
                &request.student_id,
                format!("Your request with {} was approved", request.provider_name),
            ),
            (_, Decision::Decline { .. }) => (
                &request.student_id,
                format!(
                    "Your request with {} was declined: {}",
                    request.provider_name,
                    request.rejection_reason.as_deref().unwrap_or_default()
                ),
            ),
            (_, Decision::Suggest { suggested_time }) => (
                &request.student_id,
                format!(
                    "{} suggested a new time: {}",
                    request.provider_name,
                    suggested_time.format("%Y-%m-%d %H:%M UTC")
                ),
            ),
        };
        self.tell(recipient, title, &request.id).await;
        Ok(request)
    }

    /// Close an approved session with a report. The report and the
    /// `Completed` status are stored in one write, so a refused completion
    /// leaves no report behind.
    #[tracing::instrument(name = "Complete Session", skip(self, report))]
    pub async fn complete(
        &self,
        request_id: &str,
        actor_id: &str,
        report: SessionReportPayload,
    ) -> Result<Request, AppError> {
        report.validate()?;

        let current = requests::fetch_request(&self.store, request_id).await?;
        match self.actor(&current, actor_id) {
            Some(Actor::Provider | Actor::Admin) => {}
            _ => {
                return Err(AppError::forbidden_error(
                    "Only the provider can close this session",
                ))
            }
        }

        let now = self.clock.now();
        let at = not_before(now, &current);
        let (request, _) = requests::complete_request(
            &self.store,
            request_id,
            Report {
                id: String::new(),
                request_id: current.id.clone(),
                author_id: current.provider_id.clone(),
                student_id: current.student_id.clone(),
                summary: report.summary,
                topics: report.topics,
                follow_up: report.follow_up,
                date: at,
            },
            self.settings.id_strategy,
            now,
            |latest| {
                if latest.status != RequestStatus::Approved {
                    return Err(AppError::illegal_transition(format!(
                        "Only approved sessions can be completed; this one is {}",
                        latest.status
                    )));
                }
                Ok(RequestPatch {
                    status: Some(RequestStatus::Completed),
                    completed_at: Some(at),
                    ..Default::default()
                })
            },
        )
        .await?;
        tracing::info!("session completed");

        self.tell(
            &request.student_id,
            format!("Your session with {} is complete", request.provider_name),
            &request.id,
        )
        .await;
        Ok(request)
    }

    /// Rate a completed session. A request is rated at most once.
    #[tracing::instrument(name = "Rate Session", skip(self, comment))]
    pub async fn rate(
        &self,
        request_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Request, AppError> {
        let payload = RatingPayload { rating, comment };
        payload.validate()?;

        let now = self.clock.now();
        let request = requests::transition_request(&self.store, request_id, |current| {
            if current.status != RequestStatus::Completed {
                return Err(AppError::illegal_transition(format!(
                    "Only completed sessions can be rated; this one is {}",
                    current.status
                )));
            }
            if current.rating.is_some() {
                return Err(AppError::already_rated(&current.id));
            }
            Ok(RequestPatch {
                rating: Some(payload.rating),
                comment: payload.comment,
                rated_at: Some(not_before(now, current)),
                ..Default::default()
            })
        })
        .await?;
        tracing::info!(rating, "session rated");
        Ok(request)
    }

    /// Hard delete of the request and its session report. Admin only;
    /// nobody is notified.
    #[tracing::instrument(name = "Delete Request", skip(self))]
    pub async fn delete(&self, request_id: &str, actor_id: &str) -> Result<Request, AppError> {
        if !self.settings.is_admin(actor_id) {
            return Err(AppError::forbidden_error(
                "Only administrators can delete requests",
            ));
        }
        let request = requests::delete_request(&self.store, request_id).await?;
        tracing::info!("request deleted");
        Ok(request)
    }

    /// Attach a meeting link and/or location to an approved session.
    #[tracing::instrument(name = "Set Session Details", skip(self, details))]
    pub async fn set_session_details(
        &self,
        request_id: &str,
        actor_id: &str,
        details: SessionDetailsPayload,
    ) -> Result<Request, AppError> {
        details.validate()?;
        if details.meeting_link.is_none() && details.location.is_none() {
            return Err(AppError::validation_error(
                "Provide a meeting link or a location",
            ));
        }

        let request = requests::transition_request(&self.store, request_id, |current| {
            if current.status != RequestStatus::Approved {
                return Err(AppError::illegal_transition(format!(
                    "Session details can only be set on approved sessions; this one is {}",
                    current.status
                )));
            }
            match self.actor(current, actor_id) {
                Some(Actor::Provider | Actor::Admin) => {}
                _ => {
                    return Err(AppError::forbidden_error(
                        "Only the provider can set session details",
                    ))
                }
            }
            Ok(RequestPatch {
                meeting_link: details.meeting_link,
                location: details.location,
                ..Default::default()
            })
        })
        .await?;

        self.tell(
            &request.student_id,
            format!("Session details updated by {}", request.provider_name),
            &request.id,
        )
        .await;
        Ok(request)
    }

    pub async fn find_request(&self, request_id: &str) -> Result<Request, AppError> {
        requests::fetch_request(&self.store, request_id).await
    }

    pub async fn list_requests(&self) -> Result<Vec<Request>, AppError> {
        requests::get_requests(&self.store).await
    }

    pub async fn requests_for_student(&self, student_id: &str) -> Result<Vec<Request>, AppError> {
        requests::get_requests_for_student(&self.store, student_id).await
    }

    pub async fn requests_for_provider(&self, provider_id: &str) -> Result<Vec<Request>, AppError> {
        requests::get_requests_for_provider(&self.store, provider_id).await
    }

    pub async fn requests_by_status(&self, status: RequestStatus) -> Result<Vec<Request>, AppError> {
        requests::get_requests_by_status(&self.store, status).await
    }

    /// Approved sessions a provider still has to run.
    pub async fn active_sessions(&self, provider_id: &str) -> Result<Vec<Request>, AppError> {
        Ok(self
            .requests_for_provider(provider_id)
            .await?
            .into_iter()
            .filter(|r| r.status == RequestStatus::Approved)
            .collect())
    }

    pub async fn history(&self, student_id: &str) -> Result<Vec<Request>, AppError> {
        Ok(self
            .requests_for_student(student_id)
            .await?
            .into_iter()
            .filter(|r| r.status.is_terminal())
            .collect())
    }

    pub async fn session_notes(&self, provider_id: &str) -> Result<Vec<Report>, AppError> {
        reports::get_reports_by_author(&self.store, provider_id).await
    }

    pub async fn report_for_request(&self, request_id: &str) -> Result<Option<Report>, AppError> {
        reports::get_report_for_request(&self.store, request_id).await
    }
}
