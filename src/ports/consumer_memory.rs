//! In-memory `PartitionConsumer` used by engine tests and local/dev runs:
//! replays a fixed sequence of events per partition, then reports
//! exhaustion (`None`) forever — enough to exercise every termination path
//! in the stream engine deterministically, without a broker.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::ConsumedEvent;
use crate::ports::consumer::{ConsumerError, PartitionConsumer};

pub struct InMemoryPartitionConsumer {
    queue: Mutex<std::collections::VecDeque<ConsumedEvent>>,
}

impl InMemoryPartitionConsumer {
    pub fn new(events: impl IntoIterator<Item = ConsumedEvent>) -> Self {
        Self {
            queue: Mutex::new(events.into_iter().collect()),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

#[async_trait]
impl PartitionConsumer for InMemoryPartitionConsumer {
    async fn read_event(&self) -> Result<Option<ConsumedEvent>, ConsumerError> {
        Ok(self.queue.lock().unwrap().pop_front())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NakadiCursor;

    #[tokio::test]
    async fn drains_then_reports_none_forever() {
        let consumer = InMemoryPartitionConsumer::new(vec![ConsumedEvent::new(
            "{}",
            NakadiCursor::new("et", "0", "1"),
        )]);
        assert!(consumer.read_event().await.unwrap().is_some());
        assert!(consumer.read_event().await.unwrap().is_none());
        assert!(consumer.read_event().await.unwrap().is_none());
    }
}
