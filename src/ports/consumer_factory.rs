//! Consumer factory: resolves a `StreamConfig`'s cursors into a concrete
//! `PartitionConsumer` for the low-level stream handler. Not part of the
//! core streaming-engine contract (C3 takes an already-built consumer);
//! this is the glue the HTTP layer needs to build one per request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{Offset, TopicPartitionList};
use thiserror::Error;

use crate::model::NakadiCursor;
use crate::ports::consumer::PartitionConsumer;
use crate::ports::consumer_kafka::KafkaPartitionConsumer;

#[derive(Debug, Error)]
pub enum ConsumerFactoryError {
    #[error("failed to create upstream consumer: {0}")]
    Config(String),
}

#[async_trait]
pub trait ConsumerFactory: Send + Sync {
    async fn create(
        &self,
        event_type: &str,
        cursors: Vec<NakadiCursor>,
    ) -> Result<Arc<dyn PartitionConsumer>, ConsumerFactoryError>;
}

/// Builds one `StreamConsumer` per request, manually assigned (no
/// consumer-group rebalancing) and seeked to the client-supplied cursors —
/// the low-level stream's fixed-assignment contract (§6).
pub struct KafkaConsumerFactory {
    bootstrap_servers: String,
    poll_budget: Duration,
}

impl KafkaConsumerFactory {
    pub fn new(bootstrap_servers: impl Into<String>, poll_budget: Duration) -> Self {
        Self { bootstrap_servers: bootstrap_servers.into(), poll_budget }
    }
}

#[async_trait]
impl ConsumerFactory for KafkaConsumerFactory {
    async fn create(
        &self,
        event_type: &str,
        cursors: Vec<NakadiCursor>,
    ) -> Result<Arc<dyn PartitionConsumer>, ConsumerFactoryError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", format!("anonymous-{event_type}"))
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e: KafkaError| ConsumerFactoryError::Config(e.to_string()))?;

        let mut assignment = TopicPartitionList::new();
        for cursor in &cursors {
            let partition: i32 = cursor
                .partition
                .parse()
                .map_err(|_| ConsumerFactoryError::Config(format!("partition '{}' is not numeric", cursor.partition)))?;
            let offset: i64 = cursor
                .offset
                .parse()
                .map_err(|_| ConsumerFactoryError::Config(format!("offset '{}' is not numeric", cursor.offset)))?;
            assignment
                .add_partition_offset(event_type, partition, Offset::Offset(offset))
                .map_err(|e| ConsumerFactoryError::Config(e.to_string()))?;
        }
        consumer.assign(&assignment).map_err(|e| ConsumerFactoryError::Config(e.to_string()))?;

        Ok(Arc::new(KafkaPartitionConsumer::new(consumer, event_type, self.poll_budget)))
    }
}
