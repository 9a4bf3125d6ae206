//! Event-type repository port: out of scope per the core design (§2), but a
//! concrete interface and adapter are needed for a runnable build.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct EventTypeInfo {
    pub name: String,
    pub read_scopes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EventTypeRepositoryError {
    #[error("event type repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EventTypeRepository: Send + Sync {
    /// `None` if the event type does not exist; this is how C8 builds its
    /// "missing event types" set without a dedicated existence check.
    async fn find(&self, name: &str) -> Result<Option<EventTypeInfo>, EventTypeRepositoryError>;
}

/// In-memory fake, used throughout the test suite.
pub struct InMemoryEventTypeRepository {
    event_types: dashmap::DashMap<String, EventTypeInfo>,
}

impl InMemoryEventTypeRepository {
    pub fn new() -> Self {
        Self { event_types: dashmap::DashMap::new() }
    }

    pub fn register(&self, name: impl Into<String>, read_scopes: Vec<String>) {
        let name = name.into();
        self.event_types.insert(name.clone(), EventTypeInfo { name, read_scopes });
    }
}

impl Default for InMemoryEventTypeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventTypeRepository for InMemoryEventTypeRepository {
    async fn find(&self, name: &str) -> Result<Option<EventTypeInfo>, EventTypeRepositoryError> {
        Ok(self.event_types.get(name).map(|entry| entry.clone()))
    }
}

/// `reqwest`-backed production adapter calling an external metadata service.
pub struct HttpEventTypeRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventTypeRepository {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[derive(serde::Deserialize)]
struct EventTypeResponse {
    name: String,
    #[serde(default)]
    read_scopes: Vec<String>,
}

#[async_trait]
impl EventTypeRepository for HttpEventTypeRepository {
    async fn find(&self, name: &str) -> Result<Option<EventTypeInfo>, EventTypeRepositoryError> {
        let url = format!("{}/event-types/{}", self.base_url, urlencoding::encode(name));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EventTypeRepositoryError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: EventTypeResponse = response
            .error_for_status()
            .map_err(|e| EventTypeRepositoryError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| EventTypeRepositoryError::Unavailable(e.to_string()))?;

        Ok(Some(EventTypeInfo { name: body.name, read_scopes: body.read_scopes }))
    }
}
