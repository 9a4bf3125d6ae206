//! Subscription store port (C7): persistence with unique-key semantics over
//! `U = (owningApplication, eventTypes, consumerGroup)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Subscription, SubscriptionBase};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Two concurrent creates raced on the same `U`; at most one insertion
    /// wins and the other observes this signal. Never surfaced to the
    /// client directly — C8 translates it into an idempotent 200 OK.
    #[error("a subscription for this owning_application/event_types/consumer_group already exists")]
    DuplicatedSubscription,

    #[error("subscription store unavailable: {0}")]
    Unavailable(String),

    #[error("subscription store error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn create(&self, base: SubscriptionBase, created_at: DateTime<Utc>) -> Result<Subscription, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Subscription>, StoreError>;

    async fn get_by_base(&self, base: &SubscriptionBase) -> Result<Option<Subscription>, StoreError>;

    async fn list(
        &self,
        owning_application: Option<&str>,
        event_types: &[String],
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Subscription>, StoreError>;
}

pub mod memory {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    /// Mutex/RwLock-guarded map keyed by the canonicalized `U`. `create` is
    /// atomic with respect to the uniqueness check: the write lock is held
    /// across the existence check and the insertion, so two racing creates
    /// for the same `U` cannot both observe "absent" and both insert.
    #[derive(Default)]
    pub struct InMemorySubscriptionStore {
        by_base: RwLock<HashMap<SubscriptionBase, Subscription>>,
        by_id: RwLock<HashMap<Uuid, Subscription>>,
    }

    impl InMemorySubscriptionStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl SubscriptionStore for InMemorySubscriptionStore {
        async fn create(&self, base: SubscriptionBase, created_at: DateTime<Utc>) -> Result<Subscription, StoreError> {
            let mut by_base = self.by_base.write().await;
            if by_base.contains_key(&base) {
                return Err(StoreError::DuplicatedSubscription);
            }
            let subscription = Subscription::new(base.clone(), created_at);
            by_base.insert(base, subscription.clone());
            self.by_id.write().await.insert(subscription.id, subscription.clone());
            Ok(subscription)
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Option<Subscription>, StoreError> {
            Ok(self.by_id.read().await.get(&id).cloned())
        }

        async fn get_by_base(&self, base: &SubscriptionBase) -> Result<Option<Subscription>, StoreError> {
            Ok(self.by_base.read().await.get(base).cloned())
        }

        async fn list(
            &self,
            owning_application: Option<&str>,
            event_types: &[String],
            offset: u32,
            limit: u32,
        ) -> Result<Vec<Subscription>, StoreError> {
            let by_id = self.by_id.read().await;
            let mut matches: Vec<Subscription> = by_id
                .values()
                .filter(|s| owning_application.map_or(true, |app| s.owning_application == app))
                .filter(|s| event_types.is_empty() || event_types.iter().all(|et| s.event_types.contains(et)))
                .cloned()
                .collect();
            matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(matches
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn base(app: &str, group: &str) -> SubscriptionBase {
            SubscriptionBase::new(app, vec!["orders.placed".to_string()], group)
        }

        #[tokio::test]
        async fn second_create_of_same_u_is_duplicated() {
            let store = InMemorySubscriptionStore::new();
            let now = Utc::now();
            let first = store.create(base("app", "group"), now).await.unwrap();
            let second = store.create(base("app", "group"), now).await;
            assert!(matches!(second, Err(StoreError::DuplicatedSubscription)));

            let recovered = store.get_by_base(&base("app", "group")).await.unwrap().unwrap();
            assert_eq!(recovered.id, first.id);
        }

        #[tokio::test]
        async fn list_respects_offset_and_limit() {
            let store = InMemorySubscriptionStore::new();
            let now = Utc::now();
            for i in 0..5 {
                store.create(base("app", &format!("group-{i}")), now).await.unwrap();
            }
            let page = store.list(Some("app"), &[], 2, 2).await.unwrap();
            assert_eq!(page.len(), 2);
        }
    }
}

pub mod postgres {
    use sqlx::PgPool;
    use sqlx::Row as _;

    use super::*;

    /// Postgres-backed adapter. `U` is enforced by a unique index over
    /// `(owning_application, event_types, consumer_group)` where
    /// `event_types` is stored pre-canonicalized (sorted, `,`-joined) so the
    /// index collides `{a,b}` and `{b,a}` as the spec requires.
    ///
    /// Expected schema:
    /// ```sql
    /// CREATE TABLE subscriptions (
    ///     id UUID PRIMARY KEY,
    ///     owning_application TEXT NOT NULL,
    ///     event_types TEXT NOT NULL,       -- sorted, comma-joined
    ///     consumer_group TEXT NOT NULL,
    ///     created_at TIMESTAMPTZ NOT NULL,
    ///     UNIQUE (owning_application, event_types, consumer_group)
    /// );
    /// ```
    pub struct PgSubscriptionStore {
        pool: PgPool,
    }

    impl PgSubscriptionStore {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        fn canonical_event_types(base: &SubscriptionBase) -> String {
            base.event_types.iter().cloned().collect::<Vec<_>>().join(",")
        }

        fn row_to_subscription(
            id: Uuid,
            owning_application: String,
            event_types: String,
            consumer_group: String,
            created_at: DateTime<Utc>,
        ) -> Subscription {
            Subscription {
                id,
                owning_application,
                event_types: event_types.split(',').filter(|s| !s.is_empty()).map(String::from).collect(),
                consumer_group,
                created_at,
            }
        }

        /// Postgres SQLSTATE for a unique-violation.
        const UNIQUE_VIOLATION: &'static str = "23505";

        fn classify(err: sqlx::Error) -> StoreError {
            match &err {
                sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(Self::UNIQUE_VIOLATION) => {
                    StoreError::DuplicatedSubscription
                }
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Unavailable(err.to_string()),
                other => StoreError::Internal(other.to_string()),
            }
        }
    }

    #[async_trait]
    impl SubscriptionStore for PgSubscriptionStore {
        async fn create(&self, base: SubscriptionBase, created_at: DateTime<Utc>) -> Result<Subscription, StoreError> {
            let id = Uuid::new_v4();
            let event_types = Self::canonical_event_types(&base);
            sqlx::query(
                "INSERT INTO subscriptions (id, owning_application, event_types, consumer_group, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(&base.owning_application)
            .bind(&event_types)
            .bind(&base.consumer_group)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(Self::classify)?;

            Ok(Self::row_to_subscription(id, base.owning_application, event_types, base.consumer_group, created_at))
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Option<Subscription>, StoreError> {
            let row = sqlx::query(
                "SELECT id, owning_application, event_types, consumer_group, created_at
                 FROM subscriptions WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::classify)?;

            Ok(row.map(|row| {
                Self::row_to_subscription(
                    row.get("id"),
                    row.get("owning_application"),
                    row.get("event_types"),
                    row.get("consumer_group"),
                    row.get("created_at"),
                )
            }))
        }

        async fn get_by_base(&self, base: &SubscriptionBase) -> Result<Option<Subscription>, StoreError> {
            let event_types = Self::canonical_event_types(base);
            let row = sqlx::query(
                "SELECT id, owning_application, event_types, consumer_group, created_at
                 FROM subscriptions
                 WHERE owning_application = $1 AND event_types = $2 AND consumer_group = $3",
            )
            .bind(&base.owning_application)
            .bind(&event_types)
            .bind(&base.consumer_group)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::classify)?;

            Ok(row.map(|row| {
                Self::row_to_subscription(
                    row.get("id"),
                    row.get("owning_application"),
                    row.get("event_types"),
                    row.get("consumer_group"),
                    row.get("created_at"),
                )
            }))
        }

        async fn list(
            &self,
            owning_application: Option<&str>,
            event_types: &[String],
            offset: u32,
            limit: u32,
        ) -> Result<Vec<Subscription>, StoreError> {
            // event_types filtering is done in-process after a broad owning
            // application scan: the canonical column is a joined string and
            // is not a reliable substring-match target for arbitrary subsets.
            let rows = sqlx::query(
                "SELECT id, owning_application, event_types, consumer_group, created_at
                 FROM subscriptions
                 WHERE $1::text IS NULL OR owning_application = $1
                 ORDER BY created_at, id",
            )
            .bind(owning_application)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::classify)?;

            let matches: Vec<Subscription> = rows
                .into_iter()
                .map(|row| {
                    Self::row_to_subscription(
                        row.get("id"),
                        row.get("owning_application"),
                        row.get("event_types"),
                        row.get("consumer_group"),
                        row.get("created_at"),
                    )
                })
                .filter(|s| event_types.is_empty() || event_types.iter().all(|et| s.event_types.contains(et)))
                .collect();

            Ok(matches.into_iter().skip(offset as usize).take(limit as usize).collect())
        }
    }
}
