//! Configuration validation

use super::*;
use crate::error::{LlmError, Result};

/// Validate complete configuration
pub fn validate_config(config: &LlmConfig) -> Result<()> {
    validate_backend(config)?;
    validate_models(config)?;
    validate_retry_config(&config.retry)?;

    if let Some(service) = &config.embedding_service {
        validate_embedding_service(service)?;
    }

    if config.request_timeout_secs == 0 {
        return Err(LlmError::Config(
            "Request timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_backend(config: &LlmConfig) -> Result<()> {
    match config.backend {
        Backend::Azure => {
            let endpoint = config.endpoint.as_deref().unwrap_or_default();
            if endpoint.is_empty() {
                return Err(LlmError::Config(
                    "Azure endpoint is required (AZURE_OPENAI_ENDPOINT is not set)".to_string()
                ));
            }
            if config.api_key.expose_secret().is_empty() {
                return Err(LlmError::Config(
                    "Azure API key is required (AZURE_OPENAI_KEY is not set)".to_string()
                ));
            }
            validate_url("Azure endpoint", endpoint)?;
        }
        Backend::OpenAi => {
            if config.api_key.expose_secret().is_empty() {
                return Err(LlmError::Config(
                    "API key is required (OPENAI_API_KEY is not set)".to_string()
                ));
            }
            if let Some(base_url) = &config.endpoint {
                validate_url("Base URL", base_url)?;
            }
        }
    }

    if let Some(proxy) = &config.proxy_url {
        validate_url("Proxy URL", proxy)?;
    }

    Ok(())
}

fn validate_models(config: &LlmConfig) -> Result<()> {
    if config.model.trim().is_empty() {
        return Err(LlmError::Config("Model name cannot be empty".to_string()));
    }

    if config.embedding_model.trim().is_empty() {
        return Err(LlmError::Config("Embedding model name cannot be empty".to_string()));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<()> {
    if config.max_attempts == 0 {
        return Err(LlmError::Config(
            "Max attempts must be at least 1".to_string()
        ));
    }

    Ok(())
}

fn validate_embedding_service(config: &EmbeddingServiceConfig) -> Result<()> {
    validate_url("Embedding endpoint", &config.endpoint)?;

    if config.api_key.expose_secret().is_empty() {
        return Err(LlmError::Config(
            "Embedding API key is required (EMBEDDING_API_KEY is not set)".to_string()
        ));
    }

    if config.deployment.trim().is_empty() {
        return Err(LlmError::Config("Embedding deployment cannot be empty".to_string()));
    }

    Ok(())
}

fn validate_url(name: &str, url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(LlmError::Config(format!(
            "{} must start with http:// or https://, got {}",
            name, url
        )));
    }

    Ok(())
}
