use std::time::Duration;

use chrono::{DateTime, Months, Utc};
use tokio::time;
use tracing::{error, info};

use crate::readings::ReadingService;

/// Recurring purge of readings older than the retention window.
pub struct RetentionService {
    readings: ReadingService,
    interval: Duration,
}

impl RetentionService {
    pub fn new(readings: ReadingService, interval_secs: u64) -> Self {
        Self {
            readings,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the purge loop indefinitely. Spawn this via `tokio::spawn`.
    /// The first tick fires immediately, so one purge happens at startup.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Retention loop started");
        let mut ticker = time::interval(self.interval);

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Retention purge failed; will retry next cycle");
            }
        }
    }

    async fn run_once(&self) -> anyhow::Result<()> {
        let cutoff = retention_cutoff(Utc::now());
        let deleted = self.readings.purge_older_than(cutoff).await?;
        info!(cutoff = %cutoff, deleted, "Retention purge completed");
        Ok(())
    }
}

/// One calendar year before `now`. Chrono clamps to the last valid day of
/// the target month, so a leap day maps to Feb 28 of the prior year.
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(12)).unwrap_or(now)
}
