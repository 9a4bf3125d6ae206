//! Subscription data model: the high-level, managed consumption unit.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The uniqueness key `U = (owningApplication, eventTypes, consumerGroup)`.
///
/// `event_types` is stored as a `BTreeSet` so two requests naming the same
/// set in a different order canonicalize to the same key — the store's
/// unique constraint is defined over this canonical form (§6).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionBase {
    pub owning_application: String,
    pub event_types: BTreeSet<String>,
    pub consumer_group: String,
}

impl SubscriptionBase {
    pub fn new(
        owning_application: impl Into<String>,
        event_types: impl IntoIterator<Item = String>,
        consumer_group: impl Into<String>,
    ) -> Self {
        Self {
            owning_application: owning_application.into(),
            event_types: event_types.into_iter().collect(),
            consumer_group: consumer_group.into(),
        }
    }
}

/// A persisted subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub owning_application: String,
    pub event_types: BTreeSet<String>,
    pub consumer_group: String,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(base: SubscriptionBase, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owning_application: base.owning_application,
            event_types: base.event_types,
            consumer_group: base.consumer_group,
            created_at,
        }
    }

    pub fn base(&self) -> SubscriptionBase {
        SubscriptionBase {
            owning_application: self.owning_application.clone(),
            event_types: self.event_types.clone(),
            consumer_group: self.consumer_group.clone(),
        }
    }

    pub fn location(&self) -> String {
        format!("/subscriptions/{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_canonicalizes_event_type_order() {
        let a = SubscriptionBase::new("app", ["b".to_string(), "a".to_string()], "group");
        let b = SubscriptionBase::new("app", ["a".to_string(), "b".to_string()], "group");
        assert_eq!(a, b, "event type order must not affect the uniqueness key");
    }
}
