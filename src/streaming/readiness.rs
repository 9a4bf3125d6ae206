//! Connection liveness check (§4.2 step 1): lets the engine notice a
//! client disconnect before spending a read/flush pass on a dead stream.

pub trait ConnectionReadiness: Send + Sync {
    fn is_ready(&self) -> bool;
}

/// Used by the low-level handler's `tokio::io::duplex` pipe and by tests:
/// the sink write itself is what eventually surfaces a disconnect, so this
/// check always reports ready.
pub struct AlwaysReady;

impl ConnectionReadiness for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }
}

/// Wraps an outbound channel half; reports not-ready once the receiver has
/// been dropped, which is how axum signals a client that went away.
pub struct ChannelReadiness<T> {
    sender: tokio::sync::mpsc::Sender<T>,
}

impl<T> ChannelReadiness<T> {
    pub fn new(sender: tokio::sync::mpsc::Sender<T>) -> Self {
        Self { sender }
    }
}

impl<T: Send + Sync> ConnectionReadiness for ChannelReadiness<T> {
    fn is_ready(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_ready_is_always_ready() {
        assert!(AlwaysReady.is_ready());
    }

    #[tokio::test]
    async fn channel_readiness_reflects_receiver_drop() {
        let (tx, rx) = tokio::sync::mpsc::channel::<()>(1);
        let readiness = ChannelReadiness::new(tx);
        assert!(readiness.is_ready());
        drop(rx);
        assert!(!readiness.is_ready());
    }
}
