//! Blacklist port (C4): administrative circuit-breaker. Read-only from the
//! engine's perspective and must be safe for concurrent read access — many
//! connections check it on every loop iteration.

use async_trait::async_trait;

#[async_trait]
pub trait Blacklist: Send + Sync {
    /// Is consumption blocked for `(event_type, consuming_app)`?
    async fn is_blocked(&self, event_type: &str, consuming_app: &str) -> bool;
}

/// `dashmap`-backed adapter for tests and local/dev runs. Admin-mutable via
/// `block`/`unblock` so tests can flip the gate mid-scenario.
pub struct InMemoryBlacklist {
    blocked: dashmap::DashSet<(String, String)>,
}

impl InMemoryBlacklist {
    pub fn new() -> Self {
        Self { blocked: dashmap::DashSet::new() }
    }

    pub fn block(&self, event_type: impl Into<String>, consuming_app: impl Into<String>) {
        self.blocked.insert((event_type.into(), consuming_app.into()));
    }

    pub fn unblock(&self, event_type: &str, consuming_app: &str) {
        self.blocked.remove(&(event_type.to_string(), consuming_app.to_string()));
    }
}

impl Default for InMemoryBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Blacklist for InMemoryBlacklist {
    async fn is_blocked(&self, event_type: &str, consuming_app: &str) -> bool {
        self.blocked.contains(&(event_type.to_string(), consuming_app.to_string()))
    }
}

/// Redis-backed adapter: `GET blacklist:{event_type}:{consuming_app}`.
/// The key space is owned and written to by an external admin tool; this
/// adapter only ever reads.
pub struct RedisBlacklist {
    client: redis::Client,
}

impl RedisBlacklist {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(event_type: &str, consuming_app: &str) -> String {
        format!("blacklist:{event_type}:{consuming_app}")
    }
}

#[async_trait]
impl Blacklist for RedisBlacklist {
    async fn is_blocked(&self, event_type: &str, consuming_app: &str) -> bool {
        use redis::AsyncCommands;
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            // A port that cannot be reached must not be allowed to wedge the
            // loop; fail open and let the upstream/heartbeat checks notice
            // real problems instead.
            return false;
        };
        conn.exists(Self::key(event_type, consuming_app)).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_only_the_exact_pair() {
        let blacklist = InMemoryBlacklist::new();
        blacklist.block("orders.placed", "app-a");

        assert!(blacklist.is_blocked("orders.placed", "app-a").await);
        assert!(!blacklist.is_blocked("orders.placed", "app-b").await);
        assert!(!blacklist.is_blocked("orders.cancelled", "app-a").await);
    }

    #[tokio::test]
    async fn unblock_clears_the_gate() {
        let blacklist = InMemoryBlacklist::new();
        blacklist.block("orders.placed", "app-a");
        blacklist.unblock("orders.placed", "app-a");
        assert!(!blacklist.is_blocked("orders.placed", "app-a").await);
    }
}
