//! Core data types shared across the broker: cursors, events, subscriptions.

pub mod cursor;
pub mod event;
pub mod subscription;

pub use cursor::{Cursor, NakadiCursor};
pub use event::{ConsumedEvent, EventTypePartition};
pub use subscription::{Subscription, SubscriptionBase};
