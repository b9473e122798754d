use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use std::time::Duration;

use crate::config::SessionConfig;

const MIN_WAIT: Duration = Duration::from_millis(1);

/// Daily cutoff in a fixed-offset zone.
#[derive(Debug, Clone)]
pub struct MarketClose {
    cutoff: NaiveTime,
    offset: FixedOffset,
    recheck_interval: Duration,
}

impl MarketClose {
    pub fn new(cutoff: NaiveTime, offset: FixedOffset, recheck_interval: Duration) -> Self {
        Self {
            cutoff,
            offset,
            recheck_interval,
        }
    }

    pub fn from_config(cfg: &SessionConfig) -> Result<Self> {
        Ok(Self::new(
            cfg.cutoff_time()?,
            cfg.offset()?,
            Duration::from_secs(cfg.recheck_interval_secs),
        ))
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    /// Closed once the local time of day reaches the cutoff.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.local_time(now).time() >= self.cutoff
    }

    pub fn time_until_close(&self, now: DateTime<Utc>) -> Duration {
        if self.is_closed_at(now) {
            return Duration::ZERO;
        }
        (self.cutoff - self.local_time(now).time())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Sleep until the cutoff, but never longer than the recheck interval.
    pub fn next_wait(&self, now: DateTime<Utc>) -> Duration {
        self.time_until_close(now)
            .min(self.recheck_interval)
            .max(MIN_WAIT)
    }

    /// Resolve once the wall clock reaches the cutoff.
    pub async fn wait(&self) {
        loop {
            let now = Utc::now();
            if self.is_closed_at(now) {
                return;
            }
            let wait = self.next_wait(now);
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Waiting for market close");
            tokio::time::sleep(wait).await;
        }
    }
}
