use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Entity;
use crate::core::{AppError, IdStrategy};
use crate::models::reports::Report;
use crate::store::Store;

impl Entity for Report {
    const COLLECTION: &'static str = "reports";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_prefix(&self) -> &'static str {
        "report-"
    }
}

/// One report per request: a second write for the same request replaces the
/// first and keeps its id.
pub(super) fn upsert_row(
    rows: &mut Vec<Value>,
    mut report: Report,
    strategy: IdStrategy,
    now: DateTime<Utc>,
) -> Result<Report, AppError> {
    let existing = rows.iter().position(|row| for_request(row, &report.request_id));

    match existing {
        Some(index) => {
            if let Some(id) = super::row_id(&rows[index]) {
                report.id = id.to_string();
            }
            rows[index] = serde_json::to_value(&report)?;
        }
        None => {
            if report.id.is_empty() {
                report.id = super::unique_id(rows, report.id_prefix(), strategy, now);
            }
            rows.push(serde_json::to_value(&report)?);
        }
    }
    Ok(report)
}

fn for_request(row: &Value, request_id: &str) -> bool {
    row.get("requestId").and_then(Value::as_str) == Some(request_id)
}

/// Drop every report row of `request_id`. Returns how many were dropped.
pub(super) fn remove_rows_for_request(rows: &mut Vec<Value>, request_id: &str) -> usize {
    let before = rows.len();
    rows.retain(|row| !for_request(row, request_id));
    before - rows.len()
}

pub async fn get_reports(store: &Store) -> Result<Vec<Report>, AppError> {
    super::list(store).await
}

pub async fn get_report_for_request(store: &Store, request_id: &str) -> Result<Option<Report>, AppError> {
    Ok(super::list_where(store, |r: &Report| r.request_id == request_id)
        .await?
        .into_iter()
        .next())
}

pub async fn get_reports_by_author(store: &Store, author_id: &str) -> Result<Vec<Report>, AppError> {
    super::list_where(store, |r: &Report| r.author_id == author_id).await
}
