//! Subscription stats source port (feeds C9): the "subscription service"
//! that knows live per-partition consumer state for an event type — out of
//! scope as a concrete system per the core design, but a named collaborator
//! the stats projector depends on.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize)]
pub struct PartitionStat {
    pub partition: String,
    pub state: String,
    pub unconsumed_events: u64,
}

#[derive(Debug, Error)]
pub enum StatsSourceError {
    #[error("stats source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SubscriptionStatsSource: Send + Sync {
    async fn lag(&self, event_type: &str) -> Result<Vec<PartitionStat>, StatsSourceError>;
}

/// In-memory fake used throughout the test suite; production wiring would
/// derive this from live consumer-group assignment plus the log's end
/// offsets, neither of which this build's scope covers.
pub struct InMemorySubscriptionStatsSource {
    by_event_type: dashmap::DashMap<String, Vec<PartitionStat>>,
}

impl InMemorySubscriptionStatsSource {
    pub fn new() -> Self {
        Self { by_event_type: dashmap::DashMap::new() }
    }

    pub fn set(&self, event_type: impl Into<String>, stats: Vec<PartitionStat>) {
        self.by_event_type.insert(event_type.into(), stats);
    }
}

impl Default for InMemorySubscriptionStatsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStatsSource for InMemorySubscriptionStatsSource {
    async fn lag(&self, event_type: &str) -> Result<Vec<PartitionStat>, StatsSourceError> {
        Ok(self.by_event_type.get(event_type).map(|entry| entry.clone()).unwrap_or_default())
    }
}
