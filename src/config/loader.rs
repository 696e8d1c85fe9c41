//! Configuration resolution from environment variables and config files

use super::{Backend, EmbeddingServiceConfig, LlmConfig, LoggingConfig, RetryConfig};
use crate::error::{LlmError, Result};
use config::File;
use secrecy::Secret;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const IS_AZURE: &str = "IS_AZURE";
pub const AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const AZURE_OPENAI_KEY: &str = "AZURE_OPENAI_KEY";
pub const AZURE_OPENAI_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const OPENAI_PROXY_URL: &str = "OPENAI_PROXY_URL";
pub const MODEL_NAME: &str = "MODEL_NAME";
pub const CHEAP_MODEL_NAME: &str = "CHEAP_MODEL_NAME";
pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const EMBEDDING_API_ENDPOINT: &str = "EMBEDDING_API_ENDPOINT";
pub const EMBEDDING_API_KEY: &str = "EMBEDDING_API_KEY";
pub const EMBEDDING_API_VERSION: &str = "EMBEDDING_API_VERSION";
pub const EMBEDDING_DEPLOYMENT: &str = "EMBEDDING_DEPLOYMENT";
pub const LLM_REQUEST_TIMEOUT_SECS: &str = "LLM_REQUEST_TIMEOUT_SECS";
pub const LLM_MAX_ATTEMPTS: &str = "LLM_MAX_ATTEMPTS";
pub const LLM_RETRY_WAIT_SECS: &str = "LLM_RETRY_WAIT_SECS";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const LOG_FORMAT: &str = "LOG_FORMAT";

/// Load `.env` if present, then resolve from the process environment
pub fn load_from_env() -> Result<LlmConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment overrides from {}", path.display());
    }

    LlmConfig::from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from a file whose keys are the variable names.
///
/// Non-empty file values win; empty or missing ones fall back to the environment.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<LlmConfig> {
    load_from_file_with_env(path, |key| std::env::var(key).ok())
}

/// Like [`load_from_file`], with `env` consulted for keys the file leaves empty
pub fn load_from_file_with_env<P, F>(path: P, env: F) -> Result<LlmConfig>
where
    P: AsRef<Path>,
    F: Fn(&str) -> Option<String>,
{
    let settings = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .build()?;

    info!("Loaded LLM configuration from {}", path.as_ref().display());

    LlmConfig::from_lookup(|key| {
        settings
            .get_string(key)
            .or_else(|_| settings.get_string(&key.to_lowercase()))
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| env(key))
    })
}

/// Build a configuration from a key lookup without validating it
pub fn resolve<F>(lookup: F) -> Result<LlmConfig>
where
    F: Fn(&str) -> Option<String>,
{
    // Empty strings are treated as unset throughout
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let require = |key: &str| {
        get(key).ok_or_else(|| LlmError::Config(format!("{} is not set", key)))
    };

    let backend = match get(IS_AZURE) {
        Some(flag) if parse_flag(&flag) => Backend::Azure,
        _ => Backend::OpenAi,
    };

    let (api_key, endpoint, proxy_url, api_version) = match backend {
        Backend::Azure => (
            require(AZURE_OPENAI_KEY)?,
            Some(require(AZURE_OPENAI_ENDPOINT)?),
            None,
            get(AZURE_OPENAI_API_VERSION),
        ),
        Backend::OpenAi => (
            require(OPENAI_API_KEY)?,
            get(OPENAI_BASE_URL),
            get(OPENAI_PROXY_URL),
            None,
        ),
    };

    let embedding_service = match get(EMBEDDING_API_ENDPOINT) {
        Some(endpoint) => Some(EmbeddingServiceConfig {
            endpoint,
            api_key: Secret::new(require(EMBEDDING_API_KEY)?),
            api_version: get(EMBEDDING_API_VERSION).or_else(|| get(AZURE_OPENAI_API_VERSION)),
            deployment: get(EMBEDDING_DEPLOYMENT)
                .unwrap_or_else(|| super::DEFAULT_EMBEDDING_DEPLOYMENT.to_string()),
        }),
        None => None,
    };

    let defaults = RetryConfig::default();
    let retry = RetryConfig {
        max_attempts: parse_or(&get, LLM_MAX_ATTEMPTS, defaults.max_attempts)?,
        wait_secs: parse_or(&get, LLM_RETRY_WAIT_SECS, defaults.wait_secs)?,
        ..defaults
    };

    let logging_defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        level: get(LOG_LEVEL).unwrap_or(logging_defaults.level),
        format: get(LOG_FORMAT).unwrap_or(logging_defaults.format),
    };

    let mut config = LlmConfig::openai(api_key);
    config.backend = backend;
    config.endpoint = endpoint;
    config.proxy_url = proxy_url;
    config.api_version = api_version;
    if let Some(model) = get(MODEL_NAME) {
        config.model = model;
    }
    config.cheap_model = get(CHEAP_MODEL_NAME);
    if let Some(model) = get(EMBEDDING_MODEL) {
        config.embedding_model = model;
    }
    config.embedding_service = embedding_service;
    config.request_timeout_secs =
        parse_or(&get, LLM_REQUEST_TIMEOUT_SECS, config.request_timeout_secs)?;
    config.retry = retry;
    config.logging = logging;

    debug!(backend = ?config.backend, model = %config.model, "Resolved LLM configuration");
    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| LlmError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
