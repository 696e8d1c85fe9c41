//! Configuration management for the LLM client core

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use secrecy::{Secret, ExposeSecret};

pub mod loader;
pub mod validation;

/// Default chat model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o-2024-05-13";

/// Default embedding model identifier (3072 dimensions)
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Default deployment name on a dedicated embedding service
pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "embedding-3-large";

/// Backend variant serving the API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Direct hosted API (bearer auth, optional base URL and proxy)
    #[default]
    OpenAi,

    /// Enterprise-hosted multi-tenant deployment (endpoint + api-key)
    Azure,
}

/// Client configuration, resolved once per client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: Backend,

    /// API credential (secured)
    #[serde(serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    pub api_key: Secret<String>,

    /// Azure endpoint, or base URL override for the direct backend
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Proxy applied to both HTTP clients
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// API version tag (Azure only, `None` uses the provider default)
    #[serde(default)]
    pub api_version: Option<String>,

    /// Default chat model
    #[serde(default = "default_model")]
    pub model: String,

    /// Secondary, cheaper chat model
    #[serde(default)]
    pub cheap_model: Option<String>,

    /// Default embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Distinct embedding service; when absent the general client is reused
    #[serde(default)]
    pub embedding_service: Option<EmbeddingServiceConfig>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dedicated embedding service (always an Azure-style deployment)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    pub endpoint: String,

    #[serde(serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    pub api_key: Secret<String>,

    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default = "default_embedding_deployment")]
    pub deployment: String,
}

/// What a call returns once every attempt has failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Log the failure and return `Ok(None)`
    #[default]
    Absorb,

    /// Log the failure and return `Err(LlmError::Exhausted)`
    Propagate,
}

/// Retry policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed wait between attempts in seconds
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// Pause before the async chat path gives up, in milliseconds
    #[serde(default = "default_failure_pause_ms")]
    pub failure_pause_ms: u64,

    #[serde(default)]
    pub on_exhausted: FailureMode,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            wait_secs: default_wait_secs(),
            failure_pause_ms: default_failure_pause_ms(),
            on_exhausted: FailureMode::default(),
        }
    }
}

impl RetryConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn failure_pause(&self) -> Duration {
        Duration::from_millis(self.failure_pause_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: pretty, json or compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_embedding_model() -> String { DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_deployment() -> String { DEFAULT_EMBEDDING_DEPLOYMENT.to_string() }
fn default_request_timeout() -> u64 { crate::chat::models::DEFAULT_TIMEOUT.as_secs() }
fn default_max_attempts() -> u32 { 10 }
fn default_wait_secs() -> u64 { 10 }
fn default_failure_pause_ms() -> u64 { 100 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl LlmConfig {
    /// Configuration for the direct hosted backend
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            backend: Backend::OpenAi,
            api_key: Secret::new(api_key.into()),
            endpoint: None,
            proxy_url: None,
            api_version: None,
            model: default_model(),
            cheap_model: None,
            embedding_model: default_embedding_model(),
            embedding_service: None,
            request_timeout_secs: default_request_timeout(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Configuration for the enterprise-hosted backend
    pub fn azure(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            backend: Backend::Azure,
            endpoint: Some(endpoint.into()),
            ..Self::openai(api_key)
        }
    }

    /// Resolve configuration from the process environment (after loading `.env`)
    pub fn from_env() -> crate::error::Result<Self> {
        loader::load_from_env()
    }

    /// Resolve configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = loader::resolve(lookup)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML/TOML/JSON file keyed by variable name
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        loader::load_from_file(path)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Custom serializer for Secret<String>
fn serialize_secret<S>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

/// Custom deserializer for Secret<String>
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Secret<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Secret::new(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LlmConfig::openai("sk-test");

        assert_eq!(config.backend, Backend::OpenAi);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.embedding_model, "text-embedding-3-large");
        assert_eq!(config.request_timeout(), Duration::from_secs(180));
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.wait(), Duration::from_secs(10));
        assert_eq!(config.retry.failure_pause(), Duration::from_millis(100));
        assert_eq!(config.retry.on_exhausted, FailureMode::Absorb);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: LlmConfig = serde_json::from_str(
            r#"{"backend": "azure", "api_key": "k", "endpoint": "https://res.openai.azure.com"}"#,
        )
        .unwrap();

        assert_eq!(config.backend, Backend::Azure);
        assert_eq!(config.api_key.expose_secret(), "k");
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }
}
