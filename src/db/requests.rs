use chrono::{DateTime, Utc};

use super::{reports, Entity};
use crate::core::{AppError, IdStrategy, DELETED_ACCOUNT};
use crate::models::reports::Report;
use crate::models::requests::{Request, RequestPatch, RequestStatus};
use crate::store::Store;

impl Entity for Request {
    const COLLECTION: &'static str = "requests";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_prefix(&self) -> &'static str {
        "req-"
    }
}

pub async fn create_request(
    store: &Store,
    request: Request,
    strategy: IdStrategy,
    now: DateTime<Utc>,
) -> Result<Request, AppError> {
    super::insert(store, request, strategy, now).await
}

pub async fn get_requests(store: &Store) -> Result<Vec<Request>, AppError> {
    super::list(store).await
}

pub async fn get_request_by_id(store: &Store, request_id: &str) -> Result<Option<Request>, AppError> {
    super::find_by_id(store, request_id).await
}

pub async fn fetch_request(store: &Store, request_id: &str) -> Result<Request, AppError> {
    get_request_by_id(store, request_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Request {} not found", request_id)))
}

pub async fn get_requests_for_student(store: &Store, student_id: &str) -> Result<Vec<Request>, AppError> {
    super::list_where(store, |r: &Request| r.student_id == student_id).await
}

pub async fn get_requests_for_provider(store: &Store, provider_id: &str) -> Result<Vec<Request>, AppError> {
    super::list_where(store, |r: &Request| r.provider_id == provider_id).await
}

pub async fn get_requests_by_status(store: &Store, status: RequestStatus) -> Result<Vec<Request>, AppError> {
    super::list_where(store, |r: &Request| r.status == status).await
}

/// Validate against the current row and apply the resulting patch in one
/// locked read-modify-write.
pub async fn transition_request<F>(store: &Store, request_id: &str, decide: F) -> Result<Request, AppError>
where
    F: FnOnce(&Request) -> Result<RequestPatch, AppError>,
{
    super::patch_with(store, request_id, decide).await
}

/// Store the session report and apply the completing patch in one locked
/// write of the namespace. When `decide` refuses, neither is written.
pub async fn complete_request<F>(
    store: &Store,
    request_id: &str,
    report: Report,
    strategy: IdStrategy,
    now: DateTime<Utc>,
    decide: F,
) -> Result<(Request, Report), AppError>
where
    F: FnOnce(&Request) -> Result<RequestPatch, AppError>,
{
    store
        .update_snapshot(move |snapshot| {
            let mut request_rows = super::take_rows::<Request>(snapshot);
            let request = super::patch_row::<Request, _, _>(&mut request_rows, request_id, decide)?;

            let mut report_rows = super::take_rows::<Report>(snapshot);
            let report = reports::upsert_row(&mut report_rows, report, strategy, now)?;

            super::put_rows::<Request>(snapshot, request_rows);
            super::put_rows::<Report>(snapshot, report_rows);
            Ok((request, report))
        })
        .await
}

/// Remove a request together with its session report.
pub async fn delete_request(store: &Store, request_id: &str) -> Result<Request, AppError> {
    store
        .update_snapshot(|snapshot| {
            let mut request_rows = super::take_rows::<Request>(snapshot);
            let request = super::remove_row::<Request>(&mut request_rows, request_id)?;

            let mut report_rows = super::take_rows::<Report>(snapshot);
            let dropped = reports::remove_rows_for_request(&mut report_rows, request_id);
            if dropped > 0 {
                tracing::info!(request_id, dropped, "removed session report with its request");
            }

            super::put_rows::<Request>(snapshot, request_rows);
            super::put_rows::<Report>(snapshot, report_rows);
            Ok(request)
        })
        .await
}

/// Replace the display name of `profile_id` on every request it takes part
/// in. Requests themselves are kept.
pub async fn tombstone_participant(store: &Store, profile_id: &str) -> Result<usize, AppError> {
    super::update_where(store, |r: &Request| {
        let mut patch = RequestPatch::default();
        if r.student_id == profile_id {
            patch.student_name = Some(DELETED_ACCOUNT.to_string());
        }
        if r.provider_id == profile_id {
            patch.provider_name = Some(DELETED_ACCOUNT.to_string());
        }
        (patch.student_name.is_some() || patch.provider_name.is_some()).then_some(patch)
    })
    .await
}
