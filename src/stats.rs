use serde::Serialize;

/// Running counters for the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatistics {
    /// Live records.
    pub total_scripts: u64,
    /// Cumulative content and metadata reads. Never decremented.
    pub total_views: u64,
    /// Creations since startup. Not reset on day boundaries.
    pub created_today: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsEvent {
    Created,
    Viewed,
}

#[derive(Debug, Default)]
pub struct StatsAggregator {
    totals: StoreStatistics,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: StatsEvent) {
        match event {
            StatsEvent::Created => {
                self.totals.total_scripts += 1;
                self.totals.created_today += 1;
            }
            StatsEvent::Viewed => self.totals.total_views += 1,
        }
    }

    pub fn snapshot(&self) -> StoreStatistics {
        self.totals
    }

    /// Direct access for the delete path, which owns the `total_scripts` decrement.
    pub(crate) fn totals_mut(&mut self) -> &mut StoreStatistics {
        &mut self.totals
    }
}
