use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use crate::compactor;
use crate::feed::ChangeFeed;
use crate::limits::*;
use crate::schedule::Scheduler;

/// Manages per-aircraft schedulers. Each aircraft gets its own Scheduler,
/// WAL file, and compactor task. Aircraft = database name from the
/// connection (conventionally the tail number).
pub struct FleetManager {
    schedulers: DashMap<String, Arc<Scheduler>>,
    data_dir: PathBuf,
    compact_threshold: u64,
}

impl FleetManager {
    pub fn new(data_dir: PathBuf, compact_threshold: u64) -> Self {
        Self {
            schedulers: DashMap::new(),
            data_dir,
            compact_threshold,
        }
    }

    /// Get or lazily create the scheduler for the given tail number.
    pub fn get_or_create(&self, tail: &str) -> std::io::Result<Arc<Scheduler>> {
        if let Some(scheduler) = self.schedulers.get(tail) {
            return Ok(scheduler.value().clone());
        }
        if tail.len() > MAX_TAIL_NUMBER_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "tail number too long",
            ));
        }
        if self.schedulers.len() >= MAX_AIRCRAFT {
            return Err(std::io::Error::other("too many aircraft"));
        }

        // Sanitize the tail number to prevent path traversal
        let safe_name: String = tail
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if safe_name.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty tail number",
            ));
        }

        let wal_path = self.data_dir.join(format!("{safe_name}.wal"));
        let feed = Arc::new(ChangeFeed::new());
        let scheduler = Arc::new(Scheduler::new(wal_path, feed)?);

        let compactor_scheduler = scheduler.clone();
        let threshold = self.compact_threshold;
        tokio::spawn(async move {
            compactor::run_compactor(compactor_scheduler, threshold).await;
        });

        self.schedulers.insert(tail.to_string(), scheduler.clone());
        metrics::gauge!(crate::observability::SCHEDULES_ACTIVE)
            .set(self.schedulers.len() as f64);
        Ok(scheduler)
    }
}
