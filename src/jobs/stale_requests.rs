use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::core::AppError;
use crate::services::ReportingService;

/// Background job that periodically reports Pending requests past the
/// staleness window. It never writes a status; "ignored" stays derived.
/// Intervals below one second are raised to one second.
pub fn start_stale_request_monitor(
    reporting: ReportingService,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    info!("Starting stale request monitor background job");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));

        loop {
            interval.tick().await;

            if let Err(e) = check_stale_requests(&reporting).await {
                error!("Failed to check stale requests: {}", e);
            }
        }
    })
}

/// Stale request count per provider id.
async fn check_stale_requests(reporting: &ReportingService) -> Result<BTreeMap<String, usize>, AppError> {
    let per_provider = stale_requests_now(reporting).await?;

    for (provider_id, count) in &per_provider {
        warn!(provider_id = %provider_id, count, "provider has stale pending requests");
    }
    if per_provider.is_empty() {
        info!("No stale pending requests");
    }
    Ok(per_provider)
}

/// On-demand variant (admin views).
pub async fn stale_requests_now(reporting: &ReportingService) -> Result<BTreeMap<String, usize>, AppError> {
    let mut per_provider = BTreeMap::new();
    for request in reporting.stale_requests_now().await? {
        *per_provider.entry(request.provider_id).or_insert(0) += 1;
    }
    Ok(per_provider)
}
