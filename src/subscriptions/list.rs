//! Subscription listing (peripheral, §4.4): pagination validation plus the
//! link-bearing response envelope.

use serde::Serialize;

use crate::error::ApiError;
use crate::links::{self, PaginationLinks};
use crate::model::Subscription;
use crate::ports::subscription_store::SubscriptionStore;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<Subscription>,
    #[serde(rename = "_links")]
    pub links: PaginationLinks,
}

pub struct ListQuery<'a> {
    pub owning_application: Option<&'a str>,
    pub event_types: &'a [String],
    pub offset: i64,
    pub limit: i64,
}

pub async fn list(query: ListQuery<'_>, store: &dyn SubscriptionStore) -> Result<ListResponse, ApiError> {
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&query.limit) {
        return Err(ApiError::BadRequest(
            "'limit' parameter should have value from 1 to 1000".to_string(),
        ));
    }
    if query.offset < 0 {
        return Err(ApiError::BadRequest(
            "'offset' parameter can't be lower than 0".to_string(),
        ));
    }

    let offset = query.offset as u32;
    let limit = query.limit as u32;

    let items = store
        .list(query.owning_application, query.event_types, offset, limit)
        .await
        .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?;

    let links = links::build(
        "/subscriptions",
        query.owning_application,
        query.event_types,
        offset,
        limit,
        items.len() as u32,
    );

    Ok(ListResponse { items, links })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::subscription_store::memory::InMemorySubscriptionStore;

    #[tokio::test]
    async fn rejects_limit_out_of_range() {
        use axum::response::IntoResponse;

        let store = InMemorySubscriptionStore::new();
        let err = list(
            ListQuery { owning_application: None, event_types: &[], offset: 0, limit: 0 },
            &store,
        )
        .await
        .unwrap_err();
        assert!(matches!(&err, ApiError::BadRequest(msg) if msg.contains("limit")));
        assert_eq!(err.into_response().status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_negative_offset() {
        use axum::response::IntoResponse;

        let store = InMemorySubscriptionStore::new();
        let err = list(
            ListQuery { owning_application: None, event_types: &[], offset: -1, limit: 20 },
            &store,
        )
        .await
        .unwrap_err();
        assert!(matches!(&err, ApiError::BadRequest(msg) if msg.contains("offset")));
        assert_eq!(err.into_response().status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn accepts_valid_paging_window() {
        let store = InMemorySubscriptionStore::new();
        store
            .create(
                crate::model::SubscriptionBase::new("app", vec!["orders.placed".to_string()], "g1"),
                chrono::Utc::now(),
            )
            .await
            .unwrap();

        let response = list(
            ListQuery { owning_application: Some("app"), event_types: &[], offset: 0, limit: 20 },
            &store,
        )
        .await
        .unwrap();

        assert_eq!(response.items.len(), 1);
        assert!(response.links.prev.is_none());
    }
}
