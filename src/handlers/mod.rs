//! HTTP layer: route table, shared application state, and the handler
//! modules for the low-level stream and the subscription lifecycle.

pub mod stream_handler;
pub mod subscriptions_handler;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::config::Config;
use crate::ports::{
    ApplicationExistenceChecker, Blacklist, ConsumerFactory, EventTypeRepository, FeatureToggleService, ScopeChecker,
    SubscriptionStatsSource, SubscriptionStore,
};
use crate::streaming::Clock;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub subscription_store: Arc<dyn SubscriptionStore>,
    pub event_type_repo: Arc<dyn EventTypeRepository>,
    pub app_existence: Arc<dyn ApplicationExistenceChecker>,
    pub scope_checker: Arc<dyn ScopeChecker>,
    pub feature_toggles: Arc<dyn FeatureToggleService>,
    pub blacklist: Arc<dyn Blacklist>,
    pub stats_source: Arc<dyn SubscriptionStatsSource>,
    pub consumer_factory: Arc<dyn ConsumerFactory>,
    pub clock: Arc<dyn Clock>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/event-types/:name/events", get(stream_handler::stream_events))
        .route(
            "/subscriptions",
            post(subscriptions_handler::create_subscription).get(subscriptions_handler::list_subscriptions),
        )
        .route("/subscriptions/:id", get(subscriptions_handler::get_subscription))
        .route("/subscriptions/:id/stats", get(subscriptions_handler::subscription_stats))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
