//! Subscription lifecycle HTTP handlers: create-or-get (C8), list, lookup,
//! and stats (C9), each gated by `HIGH_LEVEL_API` before any port is
//! touched (§4.5 supplement).

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::Query as MultiQuery;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::{Subscription, SubscriptionBase};
use crate::ports::feature_toggles::{CHECK_OWNING_APPLICATION, HIGH_LEVEL_API};
use crate::subscriptions::{create_or_get, list, stats, CreateOutcome, CreateRequest, ListQuery};

use super::AppState;

fn token_scopes(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("x-token-scopes")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

async fn require_gateway_enabled(state: &AppState) -> Result<(), ApiError> {
    if state.feature_toggles.is_enabled(HIGH_LEVEL_API).await {
        Ok(())
    } else {
        Err(ApiError::GatewayDisabled)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub owning_application: String,
    pub event_types: Vec<String>,
    pub consumer_group: String,
}

pub async fn create_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<Response, ApiError> {
    require_gateway_enabled(&state).await?;

    let base = SubscriptionBase::new(request.owning_application, request.event_types, request.consumer_group);
    let scopes = token_scopes(&headers);
    let check_owning_application = state.feature_toggles.is_enabled(CHECK_OWNING_APPLICATION).await;

    let outcome = create_or_get(
        CreateRequest { base, token_scopes: &scopes, check_owning_application },
        state.subscription_store.as_ref(),
        state.event_type_repo.as_ref(),
        state.app_existence.as_ref(),
        state.scope_checker.as_ref(),
        chrono::Utc::now(),
    )
    .await?;

    let (status, subscription) = match outcome {
        CreateOutcome::Created(s) => (StatusCode::CREATED, s),
        CreateOutcome::AlreadyExists(s) => (StatusCode::OK, s),
    };

    let location = HeaderValue::from_str(&subscription.location()).expect("subscription location is valid ASCII");
    let mut response = (status, Json(subscription)).into_response();
    response.headers_mut().insert(axum::http::header::LOCATION, location.clone());
    if status == StatusCode::CREATED {
        response.headers_mut().insert("content-location", location);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsQuery {
    pub owning_application: Option<String>,
    /// Repeatable (`?event_type=a&event_type=b`), per §6 of the wire
    /// contract. `axum_extra::extract::Query` (rather than the stock
    /// `axum::extract::Query`) is what binds repeated keys into a `Vec`.
    #[serde(default)]
    pub event_type: Vec<String>,
    #[serde(default = "default_offset")]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_offset() -> i64 {
    0
}

fn default_limit() -> i64 {
    crate::subscriptions::list::DEFAULT_LIMIT
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    MultiQuery(query): MultiQuery<ListSubscriptionsQuery>,
) -> Result<Json<crate::subscriptions::ListResponse>, ApiError> {
    require_gateway_enabled(&state).await?;

    let event_types = query.event_type;

    let response = list(
        ListQuery {
            owning_application: query.owning_application.as_deref(),
            event_types: &event_types,
            offset: query.offset,
            limit: query.limit,
        },
        state.subscription_store.as_ref(),
    )
    .await?;

    Ok(Json(response))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError> {
    require_gateway_enabled(&state).await?;

    let subscription = state
        .subscription_store
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("subscription {id} does not exist")))?;

    Ok(Json(subscription))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub event_type: Option<String>,
}

pub async fn subscription_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<crate::subscriptions::StatsResponse>, ApiError> {
    require_gateway_enabled(&state).await?;

    let response = stats(
        id,
        query.event_type.as_deref(),
        state.subscription_store.as_ref(),
        state.stats_source.as_ref(),
    )
    .await?;

    Ok(Json(response))
}
