//! Redirect counters
//!
//! Each mutation is one read-modify-write against the store. Two triggers
//! firing for the same navigation can double count; that over-count is
//! accepted rather than coordinated away.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::{self, keys, KeyValueStore};
use crate::types::RedirectStats;

pub struct StatsAggregator {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Load the counters, creating and rolling them over as needed.
    ///
    /// The record is written back only when it was created, repaired, or
    /// rolled over to a new day.
    pub async fn load(&self) -> Result<RedirectStats> {
        let today = self.clock.today();
        let stored: Option<RedirectStats> = storage::load(self.store.as_ref(), keys::STATS).await?;

        let created = stored.is_none();
        let mut stats = stored.unwrap_or_else(|| RedirectStats::new(today));
        let repaired = stats.repair();
        let rolled = stats.roll_over(today);

        if created || repaired || rolled {
            storage::save(self.store.as_ref(), keys::STATS, &stats).await?;
        }

        Ok(stats)
    }

    /// Count one redirect and return the updated snapshot.
    pub async fn record_redirect(&self) -> Result<RedirectStats> {
        let mut stats = self.load().await?;
        stats.record(self.clock.now());
        storage::save(self.store.as_ref(), keys::STATS, &stats).await?;
        log::debug!("redirect counted: today={} total={}", stats.today, stats.total);
        Ok(stats)
    }
}
