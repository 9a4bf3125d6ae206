//! Stream engine (C5): the core loop. One instance owns exactly one
//! connection's lifetime — constructed when the HTTP handler accepts a
//! streaming request, dropped when the loop returns.
//!
//! One iteration = one read attempt + one per-partition flush pass +
//! termination checks, in that order (§4.2). Four independent exit paths:
//! connection-closed and blacklist-blocked exit without a final flush;
//! stream-limit and stream-timeout exit WITH a final flush of whatever is
//! pending per partition. Keep-alive-limit exits without a flush, since by
//! definition every partition's pending batch is already empty.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::model::NakadiCursor;
use crate::ports::{Blacklist, ConsumerError, PartitionConsumer};

use super::clock::Clock;
use super::config::StreamConfig;
use super::framer::FramerKind;
use super::readiness::ConnectionReadiness;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),
    #[error("upstream consumer error: {0}")]
    Consumer(#[from] ConsumerError),
}

/// Why the loop returned. Exposed so the HTTP handler can log at the right
/// level and, for the low-level endpoint, close the body cleanly either way.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    ConnectionClosed,
    BlacklistBlocked,
    KeepAliveLimit,
    StreamLimit,
    StreamTimeout,
}

struct PartitionState {
    latest_offset: NakadiCursor,
    pending: Vec<String>,
    batch_started_at_ms: u64,
    keep_alive_in_a_row: usize,
}

impl PartitionState {
    fn new(cursor: NakadiCursor, now_ms: u64) -> Self {
        Self {
            latest_offset: cursor,
            pending: Vec::new(),
            batch_started_at_ms: now_ms,
            keep_alive_in_a_row: 0,
        }
    }
}

pub struct StreamEngine {
    config: StreamConfig,
    consumer: Arc<dyn PartitionConsumer>,
    blacklist: Arc<dyn Blacklist>,
    readiness: Arc<dyn ConnectionReadiness>,
    clock: Arc<dyn Clock>,
    framer: FramerKind,
}

impl StreamEngine {
    pub fn new(
        config: StreamConfig,
        consumer: Arc<dyn PartitionConsumer>,
        blacklist: Arc<dyn Blacklist>,
        readiness: Arc<dyn ConnectionReadiness>,
        clock: Arc<dyn Clock>,
        framer: FramerKind,
    ) -> Self {
        Self { config, consumer, blacklist, readiness, clock, framer }
    }

    /// Drains `consumer` into `sink` until one of the four termination
    /// conditions fires. Always calls `consumer.close()` before returning,
    /// on every exit path including an error.
    pub async fn run<W>(&self, sink: &mut W) -> Result<TerminationReason, EngineError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let result = self.run_inner(sink).await;
        self.consumer.close().await;
        result
    }

    async fn run_inner<W>(&self, sink: &mut W) -> Result<TerminationReason, EngineError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let start_ms = self.clock.now_ms();
        // Captured once: iteration order over partitions is then stable for
        // the lifetime of the connection, independent of map internals.
        let order: Vec<String> = self.config.cursors.iter().map(|c| c.partition.clone()).collect();
        let mut partitions: HashMap<String, PartitionState> = self
            .config
            .cursors
            .iter()
            .map(|c| (c.partition.clone(), PartitionState::new(c.clone(), start_ms)))
            .collect();

        let batch_timeout_ms = self.config.batch_timeout_secs * 1000;
        let mut messages_read: usize = 0;

        loop {
            // Step 1: termination guards that never flush.
            if !self.readiness.is_ready() {
                debug!(event_type = %self.config.event_type_name, "client connection closed, exiting without final flush");
                return Ok(TerminationReason::ConnectionClosed);
            }
            if self.blacklist.is_blocked(&self.config.event_type_name, &self.config.consuming_app_id).await {
                info!(event_type = %self.config.event_type_name, app = %self.config.consuming_app_id, "blacklisted, exiting without final flush");
                return Ok(TerminationReason::BlacklistBlocked);
            }

            // Step 2: one read attempt.
            match self.consumer.read_event().await {
                Ok(Some(event)) => {
                    let partition = event.position.partition.clone();
                    let state = partitions
                        .entry(partition.clone())
                        .or_insert_with(|| PartitionState::new(event.position.clone(), start_ms));
                    state.latest_offset = event.position.clone();
                    state.pending.push(event.event);
                    state.keep_alive_in_a_row = 0;
                    messages_read += 1;
                }
                Ok(None) => {}
                Err(err) => return Err(err.into()),
            }

            let now = self.clock.now_ms();

            // Step 3: per-partition flush pass, captured order.
            for partition in &order {
                let Some(state) = partitions.get_mut(partition) else { continue };
                let elapsed = now.saturating_sub(state.batch_started_at_ms);
                let due = elapsed >= batch_timeout_ms || state.pending.len() >= self.config.batch_limit;
                if !due {
                    continue;
                }
                let cursor = state.latest_offset.to_wire();
                self.framer.write_batch(sink, &cursor, &state.pending).await?;
                if state.pending.is_empty() {
                    state.keep_alive_in_a_row += 1;
                }
                state.pending.clear();
                state.batch_started_at_ms = now;
            }

            // Step 4: keep-alive terminator, no flush (every buffer is empty
            // by construction once every partition has hit the limit).
            if self.config.stream_keep_alive_limit != 0
                && partitions.values().all(|s| s.keep_alive_in_a_row >= self.config.stream_keep_alive_limit)
            {
                info!(event_type = %self.config.event_type_name, "keep-alive limit reached, exiting");
                return Ok(TerminationReason::KeepAliveLimit);
            }

            // Step 5: global terminators, WITH a final flush of pending data.
            let stream_timed_out =
                self.config.stream_timeout_secs != 0 && now.saturating_sub(start_ms) >= self.config.stream_timeout_secs * 1000;
            let stream_limit_reached = self.config.stream_limit != 0 && messages_read >= self.config.stream_limit;

            if stream_timed_out || stream_limit_reached {
                for partition in &order {
                    let Some(state) = partitions.get_mut(partition) else { continue };
                    if state.pending.is_empty() {
                        continue;
                    }
                    let cursor = state.latest_offset.to_wire();
                    self.framer.write_batch(sink, &cursor, &state.pending).await?;
                    state.pending.clear();
                }
                let reason = if stream_limit_reached { TerminationReason::StreamLimit } else { TerminationReason::StreamTimeout };
                info!(event_type = %self.config.event_type_name, ?reason, "stream terminator reached, final flush complete");
                return Ok(reason);
            }
        }
    }
}

impl std::fmt::Debug for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminationReason::ConnectionClosed => "connection_closed",
            TerminationReason::BlacklistBlocked => "blacklist_blocked",
            TerminationReason::KeepAliveLimit => "keep_alive_limit",
            TerminationReason::StreamLimit => "stream_limit",
            TerminationReason::StreamTimeout => "stream_timeout",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::blacklist::InMemoryBlacklist;
    use crate::ports::consumer_memory::InMemoryPartitionConsumer;
    use crate::streaming::clock::FakeClock;
    use crate::streaming::readiness::AlwaysReady;
    use crate::model::ConsumedEvent;

    fn cursor(partition: &str, offset: &str) -> NakadiCursor {
        NakadiCursor::new("orders.placed", partition, offset)
    }

    fn engine(
        config: StreamConfig,
        consumer: InMemoryPartitionConsumer,
        clock_step_ms: u64,
    ) -> StreamEngine {
        StreamEngine::new(
            config,
            Arc::new(consumer),
            Arc::new(InMemoryBlacklist::new()),
            Arc::new(AlwaysReady),
            Arc::new(FakeClock::new(clock_step_ms)),
            FramerKind::Direct,
        )
    }

    #[tokio::test]
    async fn keep_alive_limit_exits_without_final_flush() {
        let config = StreamConfig::new("orders.placed", "app-a", vec![cursor("0", "000")], 10, 1, 0, 0, 2).unwrap();
        let engine = engine(config, InMemoryPartitionConsumer::empty(), 1100);

        let mut sink = Vec::new();
        let reason = engine.run(&mut sink).await.unwrap();

        assert_eq!(reason, TerminationReason::KeepAliveLimit);
        let text = String::from_utf8(sink).unwrap();
        assert_eq!(text.matches("\"partition\":\"0\"").count(), 2);
        assert!(!text.contains("events"));
    }

    #[tokio::test]
    async fn stream_limit_flushes_pending_batch_before_exit() {
        let consumer = InMemoryPartitionConsumer::new(vec![
            ConsumedEvent::new("{\"a\":1}", cursor("0", "000")),
            ConsumedEvent::new("{\"a\":2}", cursor("0", "001")),
        ]);
        let config = StreamConfig::new("orders.placed", "app-a", vec![cursor("0", "000")], 10, 60, 2, 0, 0).unwrap();
        let engine = engine(config, consumer, 10);

        let mut sink = Vec::new();
        let reason = engine.run(&mut sink).await.unwrap();

        assert_eq!(reason, TerminationReason::StreamLimit);
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("\"events\":[{\"a\":1},{\"a\":2}]") || text.contains("{\"a\":1}"));
    }

    #[tokio::test]
    async fn blacklist_block_exits_without_flush() {
        let blacklist = Arc::new(InMemoryBlacklist::new());
        blacklist.block("orders.placed", "app-a");
        let config = StreamConfig::new("orders.placed", "app-a", vec![cursor("0", "000")], 10, 1, 0, 0, 0).unwrap();
        let engine = StreamEngine::new(
            config,
            Arc::new(InMemoryPartitionConsumer::empty()),
            blacklist,
            Arc::new(AlwaysReady),
            Arc::new(FakeClock::new(10)),
            FramerKind::Direct,
        );

        let mut sink = Vec::new();
        let reason = engine.run(&mut sink).await.unwrap();

        assert_eq!(reason, TerminationReason::BlacklistBlocked);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn connection_closed_exits_without_flush() {
        struct NeverReady;
        impl ConnectionReadiness for NeverReady {
            fn is_ready(&self) -> bool {
                false
            }
        }

        let config = StreamConfig::new("orders.placed", "app-a", vec![cursor("0", "000")], 10, 1, 0, 0, 0).unwrap();
        let engine = StreamEngine::new(
            config,
            Arc::new(InMemoryPartitionConsumer::empty()),
            Arc::new(InMemoryBlacklist::new()),
            Arc::new(NeverReady),
            Arc::new(FakeClock::new(10)),
            FramerKind::Direct,
        );

        let mut sink = Vec::new();
        let reason = engine.run(&mut sink).await.unwrap();

        assert_eq!(reason, TerminationReason::ConnectionClosed);
        assert!(sink.is_empty());
    }
}
