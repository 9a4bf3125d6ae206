//! The unit the partition consumer port (C3) hands to the stream engine.

use crate::model::cursor::NakadiCursor;

/// An event drained from a partition: opaque, already-serialized JSON text
/// plus the position it was read from.
///
/// Invariant: `position.partition` equals the partition `event` was drained
/// from. The framer (C2) never validates or re-serializes `event` — it is
/// written to the wire verbatim.
#[derive(Debug, Clone)]
pub struct ConsumedEvent {
    pub event: String,
    pub position: NakadiCursor,
}

impl ConsumedEvent {
    pub fn new(event: impl Into<String>, position: NakadiCursor) -> Self {
        Self { event: event.into(), position }
    }
}

/// `(eventTypeName, partition)` — the minimal unit a reassignable consumer
/// (§6) hands back from `get_assignment`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventTypePartition {
    pub event_type: String,
    pub partition: String,
}
