//! Broker configuration: server, feature toggles, and the backing adapters
//! a production run wires up. Loaded from a TOML file with environment
//! overrides, following the same `from_file`/`from_env`/`validate` shape
//! this service has always used.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub toggles: ToggleConfig,
    pub store: StoreConfig,
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleConfig {
    pub high_level_api: bool,
    pub check_owning_application: bool,
    pub send_batch_via_output_stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `postgres://...` for `PgSubscriptionStore`, or `memory` for local/dev
    /// runs and tests.
    pub subscription_store_url: String,
    pub blacklist_redis_url: Option<String>,
    pub metadata_service_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub kafka_bootstrap_servers: Option<String>,
    pub poll_budget_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            toggles: ToggleConfig::default(),
            store: StoreConfig::default(),
            consumer: ConsumerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            high_level_api: true,
            check_owning_application: false,
            send_batch_via_output_stream: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            subscription_store_url: "memory".to_string(),
            blacklist_redis_url: None,
            metadata_service_base_url: None,
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            kafka_bootstrap_servers: None,
            poll_budget_ms: 250,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("failed to read config file: {path}"))?;
        let config: Config = toml::from_str(&content).with_context(|| format!("failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = std::env::var("BROKER_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("BROKER_SERVER_PORT") {
            config.server.port = port.parse().context("invalid BROKER_SERVER_PORT")?;
        }
        if let Ok(url) = std::env::var("BROKER_SUBSCRIPTION_STORE_URL") {
            config.store.subscription_store_url = url;
        }
        if let Ok(url) = std::env::var("BROKER_BLACKLIST_REDIS_URL") {
            config.store.blacklist_redis_url = Some(url);
        }
        if let Ok(url) = std::env::var("BROKER_METADATA_SERVICE_URL") {
            config.store.metadata_service_base_url = Some(url);
        }
        if let Ok(servers) = std::env::var("BROKER_KAFKA_BOOTSTRAP_SERVERS") {
            config.consumer.kafka_bootstrap_servers = Some(servers);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server port cannot be 0"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request timeout cannot be 0"));
        }
        if self.store.subscription_store_url.is_empty() {
            return Err(anyhow::anyhow!("subscription_store_url cannot be empty"));
        }
        if self.consumer.poll_budget_ms == 0 {
            return Err(anyhow::anyhow!("consumer poll_budget_ms cannot be 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_store_url_is_rejected() {
        let mut config = Config::default();
        config.store.subscription_store_url = String::new();
        assert!(config.validate().is_err());
    }
}
