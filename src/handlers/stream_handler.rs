//! Low-level cursor stream HTTP handler: resolves `(event_type, cursors,
//! limits)` from the request into a `StreamConfig` (C6), then drives the
//! stream engine (C5) over a duplex pipe whose read half becomes the
//! response body (§5 supplement).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::error::ApiError;
use crate::model::Cursor;
use crate::ports::feature_toggles::SEND_BATCH_VIA_OUTPUT_STREAM;
use crate::ports::ConsumerError;
use crate::streaming::{AlwaysReady, EngineError, FramerKind, StreamConfig, StreamEngine};

use super::AppState;

const DEFAULT_BATCH_LIMIT: usize = 5000;
const DEFAULT_BATCH_FLUSH_TIMEOUT_SECS: u64 = 30;
const DUPLEX_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    #[serde(default = "default_batch_flush_timeout")]
    pub batch_flush_timeout: u64,
    #[serde(default)]
    pub stream_limit: usize,
    #[serde(default)]
    pub stream_timeout: u64,
    #[serde(default)]
    pub stream_keep_alive_limit: usize,
}

fn default_batch_limit() -> usize {
    DEFAULT_BATCH_LIMIT
}

fn default_batch_flush_timeout() -> u64 {
    DEFAULT_BATCH_FLUSH_TIMEOUT_SECS
}

pub async fn stream_events(
    State(state): State<AppState>,
    Path(event_type_name): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let consuming_app_id = headers
        .get("x-consuming-app")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown-app")
        .to_string();

    let cursors: Vec<Cursor> = headers
        .get("x-nakadi-cursors")
        .and_then(|v| v.to_str().ok())
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| ApiError::ClientInput(format!("invalid X-Nakadi-Cursors header: {e}")))?
        .unwrap_or_default();

    let nakadi_cursors = cursors
        .into_iter()
        .map(|c| c.into_nakadi_cursor(event_type_name.clone()))
        .collect::<Vec<_>>();

    let config = StreamConfig::new(
        event_type_name.clone(),
        consuming_app_id,
        nakadi_cursors.clone(),
        query.batch_limit,
        query.batch_flush_timeout,
        query.stream_limit,
        query.stream_timeout,
        query.stream_keep_alive_limit,
    )
    .map_err(|e| ApiError::ClientInput(e.to_string()))?;

    let consumer = state
        .consumer_factory
        .create(&event_type_name, nakadi_cursors)
        .await
        .map_err(|e| ApiError::UpstreamLogError(e.to_string()))?;

    let send_via_output_stream = state.feature_toggles.is_enabled(SEND_BATCH_VIA_OUTPUT_STREAM).await;
    let framer = FramerKind::from_toggle(send_via_output_stream);

    let engine = StreamEngine::new(config, consumer, state.blacklist.clone(), Arc::new(AlwaysReady), state.clock.clone(), framer);

    let (mut writer_half, reader_half) = tokio::io::duplex(DUPLEX_BUFFER_BYTES);
    tokio::spawn(async move {
        if let Err(error) = engine.run(&mut writer_half).await {
            match &error {
                // Upstream log fetch failures get `error` level with context
                // (§4.2, §7's `UpstreamLogError` category); sink I/O and
                // illegal-consumer-state exits are routine disconnects/
                // rebalances and stay at `info`.
                EngineError::Consumer(ConsumerError::Upstream(_)) => {
                    tracing::error!(%error, "stream engine exited on upstream log error");
                }
                EngineError::Sink(_) | EngineError::Consumer(ConsumerError::IllegalState(_)) => {
                    tracing::info!(%error, "stream engine exited");
                }
            }
        }
    });

    let body = axum::body::Body::from_stream(ReaderStream::new(reader_half));
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "application/x-json-stream")
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(response)
}
