use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::schedule::Scheduler;

const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that rewrites a schedule's WAL once enough appends have
/// accumulated since the last compaction. Cancelled bookings otherwise
/// grow the log forever.
pub async fn run_compactor(scheduler: Arc<Scheduler>, threshold: u64) {
    let mut interval = tokio::time::interval(CHECK_INTERVAL);
    loop {
        interval.tick().await;
        let appends = scheduler.wal_appends_since_compact().await;
        if appends < threshold {
            debug!("compactor idle: {appends}/{threshold} appends");
            continue;
        }
        match scheduler.compact_wal().await {
            Ok(()) => info!("compacted WAL after {appends} appends"),
            Err(e) => tracing::warn!("WAL compaction failed: {e}"),
        }
    }
}
