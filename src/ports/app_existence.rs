//! Application-existence port: backs §4.3 step 1 (`CHECK_OWNING_APPLICATION`).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppExistenceError {
    #[error("application existence check unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ApplicationExistenceChecker: Send + Sync {
    async fn exists(&self, owning_application: &str) -> Result<bool, AppExistenceError>;
}

/// In-memory fake: every registered application exists, everything else
/// does not.
pub struct InMemoryApplicationExistenceChecker {
    known: dashmap::DashSet<String>,
}

impl InMemoryApplicationExistenceChecker {
    pub fn new() -> Self {
        Self { known: dashmap::DashSet::new() }
    }

    pub fn register(&self, owning_application: impl Into<String>) {
        self.known.insert(owning_application.into());
    }
}

impl Default for InMemoryApplicationExistenceChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApplicationExistenceChecker for InMemoryApplicationExistenceChecker {
    async fn exists(&self, owning_application: &str) -> Result<bool, AppExistenceError> {
        Ok(self.known.contains(owning_application))
    }
}

/// `reqwest`-backed production adapter.
pub struct HttpApplicationExistenceChecker {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApplicationExistenceChecker {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl ApplicationExistenceChecker for HttpApplicationExistenceChecker {
    async fn exists(&self, owning_application: &str) -> Result<bool, AppExistenceError> {
        let url = format!("{}/apps/{}", self.base_url, urlencoding::encode(owning_application));
        let status = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppExistenceError::Unavailable(e.to_string()))?
            .status();
        Ok(status.is_success())
    }
}
