//! Stream configuration (C6): immutable per-connection parameters.

use thiserror::Error;

use crate::model::NakadiCursor;

#[derive(Debug, Error)]
pub enum StreamConfigError {
    /// `batchTimeout` of 0 would flush every loop iteration (§9); this
    /// layer requires the caller to supply a positive value.
    #[error("batch_timeout must be greater than zero")]
    ZeroBatchTimeout,
}

/// Immutable per-connection parameters resolved by the HTTP handler before
/// the engine starts. Created at request start, destroyed at request end;
/// owns no external resources.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub event_type_name: String,
    pub consuming_app_id: String,
    /// One cursor per assigned partition: the starting position to stream
    /// from.
    pub cursors: Vec<NakadiCursor>,
    pub batch_limit: usize,
    pub batch_timeout_secs: u64,
    /// 0 = unlimited.
    pub stream_limit: usize,
    /// 0 = unlimited.
    pub stream_timeout_secs: u64,
    /// 0 = unlimited.
    pub stream_keep_alive_limit: usize,
}

impl StreamConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_type_name: impl Into<String>,
        consuming_app_id: impl Into<String>,
        cursors: Vec<NakadiCursor>,
        batch_limit: usize,
        batch_timeout_secs: u64,
        stream_limit: usize,
        stream_timeout_secs: u64,
        stream_keep_alive_limit: usize,
    ) -> Result<Self, StreamConfigError> {
        if batch_timeout_secs == 0 {
            return Err(StreamConfigError::ZeroBatchTimeout);
        }
        Ok(Self {
            event_type_name: event_type_name.into(),
            consuming_app_id: consuming_app_id.into(),
            cursors,
            batch_limit,
            batch_timeout_secs,
            stream_limit,
            stream_timeout_secs,
            stream_keep_alive_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_batch_timeout() {
        let result = StreamConfig::new("et", "app", vec![], 10, 0, 0, 0, 0);
        assert!(matches!(result, Err(StreamConfigError::ZeroBatchTimeout)));
    }

    #[test]
    fn accepts_positive_batch_timeout() {
        let result = StreamConfig::new("et", "app", vec![], 10, 1, 0, 0, 0);
        assert!(result.is_ok());
    }
}
