//! Periodic purge of ended sessions.
//!
//! Sessions (and their activities) that ended more than `retention_days` ago
//! are deleted once an hour. Open sessions are never touched.

use std::time::Duration;

use chrono::Utc;
use roadmap_db::repositories::SessionRepo;
use roadmap_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the session retention loop until `cancel` is triggered.
pub async fn run(pool: DbPool, retention_days: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_days,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Session retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::days(retention_days);
                match SessionRepo::purge_inactive_older_than(&pool, cutoff).await {
                    Ok(0) => tracing::debug!("Session retention: nothing to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Session retention: purged ended sessions"),
                    Err(e) => tracing::error!(error = %e, "Session retention: cleanup failed"),
                }
            }
        }
    }
}
