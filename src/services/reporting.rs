//! Read-only aggregates for the admin views.
//!
//! The free functions are pure: the same snapshot and `as_of` always give
//! the same result. [`ReportingService`] only loads the snapshot and the
//! clock reading and hands them over.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use validator::Validate;

use crate::core::config::LifecycleConfig;
use crate::core::{AppError, Clock};
use crate::db::{profiles, ratings, requests};
use crate::models::profiles::Profile;
use crate::models::ratings::{Rating, RecordRatingPayload};
use crate::models::reporting::{ActivityMetrics, Overview, RequestFilter, RequestSummary};
use crate::models::requests::{Request, RequestStatus, ServiceKind};
use crate::store::Store;

pub fn summarize(requests: &[Request], as_of: DateTime<Utc>, staleness: Duration) -> RequestSummary {
    let mut summary = RequestSummary {
        total: requests.len(),
        ..Default::default()
    };

    for request in requests {
        match request.status {
            RequestStatus::Approved => summary.approved += 1,
            RequestStatus::Completed => {
                summary.approved += 1;
                summary.completed += 1;
            }
            RequestStatus::Declined => summary.declined += 1,
            RequestStatus::Suggested => {
                summary.pending += 1;
                summary.suggested += 1;
            }
            RequestStatus::Pending if request.is_stale(as_of, staleness) => summary.ignored += 1,
            RequestStatus::Pending => summary.pending += 1,
        }
    }
    summary
}

fn start_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0).map(|t| Utc.from_utc_datetime(&t))
}

/// Requests created inside `[from, to]` (whole days, UTC) and matching the
/// category. Rows with no timestamp at all only pass an unbounded filter.
pub fn filter_by_range(requests: &[Request], filter: &RequestFilter) -> Vec<Request> {
    let from = filter.from.and_then(start_of_day);
    let to = filter.to.and_then(|d| d.succ_opt()).and_then(start_of_day);

    requests
        .iter()
        .filter(|r| filter.category.map_or(true, |c| r.category == c))
        .filter(|r| match (r.timestamp(), from, to) {
            (_, None, None) => true,
            (None, _, _) => false,
            (Some(ts), from, to) => from.map_or(true, |f| ts >= f) && to.map_or(true, |t| ts < t),
        })
        .cloned()
        .collect()
}

/// Ratings from rated requests, followed by standalone ratings that do not
/// duplicate one of them.
pub fn collect_ratings(requests: &[Request], standalone: &[Rating]) -> Vec<Rating> {
    let mut derived: Vec<Rating> = requests
        .iter()
        .filter_map(|r| {
            r.rating.map(|rating| Rating {
                id: r.id.clone(),
                provider_id: r.provider_id.clone(),
                rater_name: r.student_name.clone(),
                rating,
                comment: r.comment.clone(),
                date: r.rated_at.or(r.completed_at),
                request_id: Some(r.id.clone()),
            })
        })
        .collect();

    let seen: HashSet<String> = derived.iter().map(|r| r.id.clone()).collect();
    derived.extend(
        standalone
            .iter()
            .filter(|r| {
                r.request_id
                    .as_ref()
                    .map_or(true, |request_id| !seen.contains(request_id))
            })
            .cloned(),
    );
    derived
}

pub fn average_rating(ratings: &[Rating], provider_id: &str) -> Option<f64> {
    let values: Vec<u8> = ratings
        .iter()
        .filter(|r| r.provider_id == provider_id)
        .map(|r| r.rating)
        .collect();
    if values.is_empty() {
        return None;
    }
    let sum: u32 = values.iter().map(|v| u32::from(*v)).sum();
    Some(f64::from(sum) / values.len() as f64)
}

/// One row per provider, busiest (most completed) first. Providers with the
/// same completed count keep their input order.
pub fn activity_metrics(
    providers: &[Profile],
    requests: &[Request],
    as_of: DateTime<Utc>,
    staleness: Duration,
) -> Vec<ActivityMetrics> {
    let mut metrics: Vec<ActivityMetrics> = providers
        .iter()
        .map(|provider| {
            let mine: Vec<&Request> = requests
                .iter()
                .filter(|r| r.provider_id == provider.id)
                .collect();

            let response_times: Vec<i64> = mine
                .iter()
                .filter_map(|r| match (r.reviewed_at, r.timestamp()) {
                    (Some(reviewed), Some(created)) => Some((reviewed - created).num_milliseconds()),
                    _ => None,
                })
                .collect();
            let avg_response_time_ms = if response_times.is_empty() {
                None
            } else {
                Some(response_times.iter().sum::<i64>() as f64 / response_times.len() as f64)
            };

            ActivityMetrics {
                provider_id: provider.id.clone(),
                provider_name: provider.name.clone(),
                avg_response_time_ms,
                ignored_count: mine.iter().filter(|r| r.is_stale(as_of, staleness)).count(),
                completed_count: mine
                    .iter()
                    .filter(|r| r.status == RequestStatus::Completed)
                    .count(),
                total_count: mine.len(),
            }
        })
        .collect();

    metrics.sort_by(|a, b| b.completed_count.cmp(&a.completed_count));
    metrics
}

pub fn stale_requests(requests: &[Request], as_of: DateTime<Utc>, staleness: Duration) -> Vec<Request> {
    requests
        .iter()
        .filter(|r| r.is_stale(as_of, staleness))
        .cloned()
        .collect()
}

pub fn overview(requests: &[Request], as_of: DateTime<Utc>, staleness: Duration) -> Overview {
    let (tutoring, counselling): (Vec<Request>, Vec<Request>) = requests
        .iter()
        .cloned()
        .partition(|r| r.service_kind() == ServiceKind::Tutoring);

    Overview {
        tutoring: summarize(&tutoring, as_of, staleness),
        counselling: summarize(&counselling, as_of, staleness),
        combined: summarize(requests, as_of, staleness),
    }
}

#[derive(Clone)]
pub struct ReportingService {
    store: Store,
    clock: Arc<dyn Clock>,
    settings: LifecycleConfig,
}

impl ReportingService {
    pub fn new(store: Store, clock: Arc<dyn Clock>, settings: LifecycleConfig) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    #[tracing::instrument(name = "Summarize Requests", skip(self))]
    pub async fn summary(&self, filter: &RequestFilter) -> Result<RequestSummary, AppError> {
        let requests = requests::get_requests(&self.store).await?;
        let selected = filter_by_range(&requests, filter);
        Ok(summarize(&selected, self.clock.now(), self.settings.staleness()))
    }

    #[tracing::instrument(name = "Filter Requests", skip(self))]
    pub async fn filter(&self, filter: &RequestFilter) -> Result<Vec<Request>, AppError> {
        let requests = requests::get_requests(&self.store).await?;
        Ok(filter_by_range(&requests, filter))
    }

    #[tracing::instrument(name = "Admin Overview", skip(self))]
    pub async fn overview(&self) -> Result<Overview, AppError> {
        let requests = requests::get_requests(&self.store).await?;
        Ok(overview(&requests, self.clock.now(), self.settings.staleness()))
    }

    #[tracing::instrument(name = "Provider Activity", skip(self))]
    pub async fn activity(&self) -> Result<Vec<ActivityMetrics>, AppError> {
        let providers = profiles::get_providers(&self.store).await?;
        let requests = requests::get_requests(&self.store).await?;
        Ok(activity_metrics(
            &providers,
            &requests,
            self.clock.now(),
            self.settings.staleness(),
        ))
    }

    pub async fn ratings(&self, provider_id: Option<&str>) -> Result<Vec<Rating>, AppError> {
        let requests = requests::get_requests(&self.store).await?;
        let standalone = ratings::get_ratings(&self.store).await?;
        Ok(collect_ratings(&requests, &standalone)
            .into_iter()
            .filter(|r| provider_id.map_or(true, |id| r.provider_id == id))
            .collect())
    }

    pub async fn average_rating(&self, provider_id: &str) -> Result<Option<f64>, AppError> {
        let ratings = self.ratings(Some(provider_id)).await?;
        Ok(average_rating(&ratings, provider_id))
    }

    /// Store a rating that is not tied to a request (seeded data).
    #[tracing::instrument(name = "Record Rating", skip(self, payload), fields(provider_id = %payload.provider_id))]
    pub async fn record_rating(
        &self,
        admin_id: &str,
        payload: RecordRatingPayload,
    ) -> Result<Rating, AppError> {
        if !self.settings.is_admin(admin_id) {
            return Err(AppError::forbidden_error("Only administrators can record ratings"));
        }
        payload.validate()?;

        let provider = profiles::get_profile_by_id(&self.store, &payload.provider_id)
            .await?
            .filter(|p| p.role.is_provider())
            .ok_or_else(|| {
                AppError::validation_error(format!("{} is not a known provider", payload.provider_id))
            })?;

        let now = self.clock.now();
        let rating = Rating {
            id: String::new(),
            provider_id: provider.id,
            rater_name: payload.rater_name,
            rating: payload.rating,
            comment: payload.comment,
            date: Some(payload.date.unwrap_or(now)),
            request_id: None,
        };
        ratings::create_rating(&self.store, rating, self.settings.id_strategy, now).await
    }

    pub async fn stale_requests_now(&self) -> Result<Vec<Request>, AppError> {
        let requests = requests::get_requests(&self.store).await?;
        Ok(stale_requests(&requests, self.clock.now(), self.settings.staleness()))
    }
}
