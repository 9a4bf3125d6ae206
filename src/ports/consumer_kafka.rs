//! Kafka-backed `PartitionConsumer` (production adapter for C3).
//!
//! Wraps an `rdkafka::consumer::StreamConsumer` already subscribed (or
//! assigned) to the partitions this connection owns. `read_event` caps its
//! wait by `poll_budget` so the engine's per-partition `batchTimeout` check
//! fires at the expected resolution even when the topic is idle (§5).

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::StreamConsumer;
use rdkafka::message::Message;

use crate::model::{ConsumedEvent, NakadiCursor};
use crate::ports::consumer::{ConsumerError, PartitionConsumer};

pub struct KafkaPartitionConsumer {
    consumer: StreamConsumer,
    event_type: String,
    poll_budget: Duration,
}

impl KafkaPartitionConsumer {
    pub fn new(consumer: StreamConsumer, event_type: impl Into<String>, poll_budget: Duration) -> Self {
        Self { consumer, event_type: event_type.into(), poll_budget }
    }
}

#[async_trait]
impl PartitionConsumer for KafkaPartitionConsumer {
    async fn read_event(&self) -> Result<Option<ConsumedEvent>, ConsumerError> {
        match tokio::time::timeout(self.poll_budget, self.consumer.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Err(kafka_err)) => Err(ConsumerError::Upstream(kafka_err.to_string())),
            Ok(Ok(message)) => {
                let payload = message
                    .payload()
                    .ok_or_else(|| ConsumerError::Upstream("message had no payload".to_string()))?;
                let body = std::str::from_utf8(payload)
                    .map_err(|e| ConsumerError::Upstream(format!("non-utf8 payload: {e}")))?
                    .to_string();
                let position = NakadiCursor::new(
                    self.event_type.clone(),
                    message.partition().to_string(),
                    message.offset().to_string(),
                );
                Ok(Some(ConsumedEvent::new(body, position)))
            }
        }
    }

    async fn close(&self) {
        // StreamConsumer has no explicit close; dropping the handle (on
        // engine exit, when this adapter is dropped) unsubscribes and
        // releases the partition assignment.
    }
}
