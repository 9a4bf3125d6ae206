//! Top-level error-to-HTTP mapping (§7): one `ApiError` variant per error
//! category, one `IntoResponse` impl that performs the category's logging
//! side-effect exactly once, centrally, rather than at each call site.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// RFC-7807-shaped problem document returned on every error path.
#[derive(Debug, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub status: u16,
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Semantic validation failure: unknown event-type(s), unknown
    /// owning-application. §4.3 — surfaced as 422.
    #[error("{0}")]
    ClientInput(String),

    /// Malformed request parameters: out-of-range pagination, bad query
    /// syntax. §4.4/§8 scenario 4 — surfaced as 400, distinct from the 422
    /// `ClientInput` category.
    #[error("{0}")]
    BadRequest(String),

    /// Scope check failed; §4.3 step 3.
    #[error("authorization mismatch: {0:?}")]
    AuthorizationMismatch(Vec<String>),

    /// Subscription / event-type missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backing store unreachable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Backing log fetch/assignment failure outside the streaming loop.
    #[error("upstream log error: {0}")]
    UpstreamLogError(String),

    /// `HIGH_LEVEL_API` disabled.
    #[error("subscription API disabled")]
    GatewayDisabled,

    /// Unclassified internal failure; mapped to 500.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ClientInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthorizationMismatch(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamLogError(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayDisabled => StatusCode::NOT_IMPLEMENTED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::ClientInput(_) => "client-input",
            ApiError::BadRequest(_) => "bad-request",
            ApiError::AuthorizationMismatch(_) => "authorization-mismatch",
            ApiError::NotFound(_) => "not-found",
            ApiError::StoreUnavailable(_) => "store-unavailable",
            ApiError::UpstreamLogError(_) => "upstream-log-error",
            ApiError::GatewayDisabled => "gateway-disabled",
            ApiError::Internal(_) => "internal",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ApiError::ClientInput(_) => "Invalid request",
            ApiError::BadRequest(_) => "Bad request",
            ApiError::AuthorizationMismatch(_) => "Forbidden",
            ApiError::NotFound(_) => "Not found",
            ApiError::StoreUnavailable(_) => "Service unavailable",
            ApiError::UpstreamLogError(_) => "Upstream log error",
            ApiError::GatewayDisabled => "Feature disabled",
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Logging happens once, here, so the level-per-category invariant
        // lives in a single place instead of scattered at call sites.
        match &self {
            ApiError::ClientInput(detail) => tracing::debug!(%detail, "client input rejected"),
            ApiError::BadRequest(detail) => tracing::debug!(%detail, "bad request"),
            ApiError::NotFound(detail) => tracing::debug!(%detail, "not found"),
            ApiError::AuthorizationMismatch(missing) => tracing::debug!(?missing, "scope mismatch"),
            ApiError::StoreUnavailable(detail) => tracing::error!(%detail, "subscription store unavailable"),
            ApiError::UpstreamLogError(detail) => tracing::error!(%detail, "upstream log error"),
            ApiError::GatewayDisabled => tracing::debug!("subscription API gateway disabled"),
            ApiError::Internal(detail) => tracing::error!(%detail, "internal error"),
        }

        let status = self.status();
        let problem = Problem {
            kind: self.kind(),
            title: self.title(),
            status: status.as_u16(),
            detail: self.to_string(),
        };
        (status, axum::Json(problem)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_input_maps_to_unprocessable_entity() {
        let response = ApiError::ClientInput("unknown event type".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn bad_request_maps_to_bad_request() {
        let response = ApiError::BadRequest("'limit' parameter should have value from 1 to 1000".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
