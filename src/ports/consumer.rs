//! Partition consumer port (C3): the abstract source of events the stream
//! engine drains. Two capability levels per §9: a fixed-assignment reader
//! (`PartitionConsumer`) and a reassignable one used by subscription-managed
//! streams (`ReassignableEventConsumer`). The engine parameterizes over the
//! base capability and never downcasts.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ConsumedEvent, EventTypePartition, NakadiCursor};

#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Partition revoked, consumer closed, or otherwise in an illegal state.
    #[error("illegal consumer state: {0}")]
    IllegalState(String),

    /// The backing log failed to serve a fetch.
    #[error("upstream log error: {0}")]
    Upstream(String),
}

/// Non-blocking (or short-blocking) read of a single event from an assigned
/// partition set, plus lifecycle close. Implementations SHOULD cap any
/// internal blocking by a poll budget so the engine's per-partition timer
/// checks fire within `batchTimeout` resolution (§5).
#[async_trait]
pub trait PartitionConsumer: Send + Sync {
    async fn read_event(&self) -> Result<Option<ConsumedEvent>, ConsumerError>;

    /// Releases the consumer. Called exactly once, on every engine exit path.
    async fn close(&self);
}

/// A `PartitionConsumer` that can additionally report and change its
/// partition assignment — used by subscription-managed streams where
/// Nakadi-side rebalancing can hand partitions to or take them from this
/// connection mid-stream.
#[async_trait]
pub trait ReassignableEventConsumer: PartitionConsumer {
    async fn get_assignment(&self) -> Vec<EventTypePartition>;

    async fn reassign(&self, cursors: Vec<NakadiCursor>) -> Result<(), ConsumerError>;
}
