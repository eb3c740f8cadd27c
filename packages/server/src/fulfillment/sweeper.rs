use std::time::Duration;

use chrono::{TimeDelta, Utc};
use sea_orm::DatabaseConnection;
use tracing::{error, info};

use super::DownloadGrants;

/// Periodically delete download verifications that expired more than
/// `retention` ago.
pub async fn run_verification_sweeper(
    db: DatabaseConnection,
    interval_secs: u64,
    retention: TimeDelta,
) {
    info!(
        interval_secs,
        retention_secs = retention.num_seconds(),
        "Starting download verification sweeper"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        match DownloadGrants::new(&db).sweep_expired(Utc::now(), retention).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Swept expired download verifications"),
            Err(e) => error!(error = %e, "Download verification sweep failed"),
        }
    }
}
