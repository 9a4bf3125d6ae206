//! Cursor codec (C1): storage-level partition positions <-> wire-level views.

use serde::{Deserialize, Serialize};

/// A position within a single partition of an event-type's log.
///
/// Offsets are opaque storage-native tokens. Ordering within a partition is
/// total; ordering across partitions is undefined — the log port is the only
/// authority on it, this type never compares offsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NakadiCursor {
    pub event_type: String,
    pub partition: String,
    pub offset: String,
}

impl NakadiCursor {
    pub fn new(event_type: impl Into<String>, partition: impl Into<String>, offset: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            partition: partition.into(),
            offset: offset.into(),
        }
    }

    /// Produce the wire-level view of this cursor (C1).
    pub fn to_wire(&self) -> Cursor {
        Cursor {
            partition: self.partition.clone(),
            offset: self.offset.clone(),
        }
    }
}

/// The externally visible cursor: `(partition, offset)` as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub partition: String,
    pub offset: String,
}

impl Cursor {
    /// Attach an event-type to recover the internal representation.
    pub fn into_nakadi_cursor(self, event_type: impl Into<String>) -> NakadiCursor {
        NakadiCursor {
            event_type: event_type.into(),
            partition: self.partition,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_view_drops_event_type() {
        let internal = NakadiCursor::new("orders.placed", "0", "001");
        let wire = internal.to_wire();
        assert_eq!(wire.partition, "0");
        assert_eq!(wire.offset, "001");
    }

    #[test]
    fn round_trips_through_wire() {
        let wire = Cursor { partition: "3".into(), offset: "999".into() };
        let internal = wire.clone().into_nakadi_cursor("orders.placed");
        assert_eq!(internal.to_wire(), wire);
    }
}
