//! Subscription stats projector (C9): composes live lag per event-type
//! from the stats source, restricted to a single event type when the
//! caller supplies the `event_type` filter query parameter.

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::ports::stats_source::{PartitionStat, SubscriptionStatsSource};
use crate::ports::subscription_store::SubscriptionStore;

#[derive(Debug, Serialize)]
pub struct EventTypeStats {
    pub event_type: String,
    pub partitions: Vec<PartitionStat>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub items: Vec<EventTypeStats>,
}

pub async fn stats(
    id: Uuid,
    event_type_filter: Option<&str>,
    store: &dyn SubscriptionStore,
    stats_source: &dyn SubscriptionStatsSource,
) -> Result<StatsResponse, ApiError> {
    let subscription = store
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("subscription {id} does not exist")))?;

    let event_types: Vec<String> = match event_type_filter {
        Some(wanted) => {
            if !subscription.event_types.contains(wanted) {
                return Err(ApiError::NotFound(format!(
                    "event type '{wanted}' is not part of subscription {id}"
                )));
            }
            vec![wanted.to_string()]
        }
        None => subscription.event_types.into_iter().collect(),
    };

    let mut items = Vec::with_capacity(event_types.len());
    for event_type in event_types {
        let partitions = stats_source
            .lag(&event_type)
            .await
            .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?;
        items.push(EventTypeStats { event_type, partitions });
    }

    Ok(StatsResponse { items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::stats_source::InMemorySubscriptionStatsSource;
    use crate::ports::subscription_store::memory::InMemorySubscriptionStore;

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let store = InMemorySubscriptionStore::new();
        let stats_source = InMemorySubscriptionStatsSource::new();
        let err = stats(Uuid::new_v4(), None, &store, &stats_source).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn filters_to_the_requested_event_type() {
        let store = InMemorySubscriptionStore::new();
        let subscription = store
            .create(
                crate::model::SubscriptionBase::new(
                    "app",
                    vec!["orders.placed".to_string(), "orders.cancelled".to_string()],
                    "g1",
                ),
                chrono::Utc::now(),
            )
            .await
            .unwrap();

        let stats_source = InMemorySubscriptionStatsSource::new();
        stats_source.set(
            "orders.placed",
            vec![PartitionStat { partition: "0".to_string(), state: "assigned".to_string(), unconsumed_events: 3 }],
        );
        stats_source.set("orders.cancelled", vec![]);

        let response = stats(subscription.id, Some("orders.placed"), &store, &stats_source).await.unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].event_type, "orders.placed");
    }
}
