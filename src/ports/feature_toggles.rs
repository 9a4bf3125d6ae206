//! Feature toggle port (§4.5, §9): process-wide read-mostly state with a
//! per-request lookup. Named gates are contracts, not identifiers.

use async_trait::async_trait;

pub const HIGH_LEVEL_API: &str = "HIGH_LEVEL_API";
pub const CHECK_OWNING_APPLICATION: &str = "CHECK_OWNING_APPLICATION";
pub const SEND_BATCH_VIA_OUTPUT_STREAM: &str = "SEND_BATCH_VIA_OUTPUT_STREAM";

#[async_trait]
pub trait FeatureToggleService: Send + Sync {
    async fn is_enabled(&self, feature: &str) -> bool;
}

/// `dashmap`-backed in-process toggle store. Production wiring seeds this
/// from `Config`; tests mutate it directly with `set`.
pub struct InMemoryFeatureToggleService {
    toggles: dashmap::DashMap<String, bool>,
}

impl InMemoryFeatureToggleService {
    pub fn new() -> Self {
        Self { toggles: dashmap::DashMap::new() }
    }

    pub fn with_defaults() -> Self {
        let service = Self::new();
        service.set(HIGH_LEVEL_API, true);
        service.set(CHECK_OWNING_APPLICATION, false);
        service.set(SEND_BATCH_VIA_OUTPUT_STREAM, true);
        service
    }

    pub fn set(&self, feature: &str, enabled: bool) {
        self.toggles.insert(feature.to_string(), enabled);
    }
}

impl Default for InMemoryFeatureToggleService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureToggleService for InMemoryFeatureToggleService {
    async fn is_enabled(&self, feature: &str) -> bool {
        self.toggles.get(feature).map(|v| *v).unwrap_or(false)
    }
}
