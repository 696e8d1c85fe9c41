//! Backend routing and authentication

use crate::config::{Backend, EmbeddingServiceConfig, LlmConfig};
use crate::error::{LlmError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::sync::Arc;

/// Default base URL of the direct hosted API
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// API version used when an Azure deployment does not pin one
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Where requests go and how they authenticate
pub trait Provider: Send + Sync + fmt::Debug {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Chat completions URL for a model
    fn chat_url(&self, model: &str) -> String;

    /// Embeddings URL for a model
    fn embeddings_url(&self, model: &str) -> String;

    /// Headers sent with every request
    fn headers(&self) -> &HeaderMap;
}

/// Direct hosted API
pub struct OpenAiProvider {
    base_url: String,
    headers: HeaderMap,
}

impl OpenAiProvider {
    pub fn new(api_key: &Secret<String>, base_url: Option<&str>) -> Result<Self> {
        let mut headers = json_headers();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret().trim()))
            .map_err(|_| {
                LlmError::Config("API key contains invalid header characters".to_string())
            })?;
        headers.insert(AUTHORIZATION, sensitive(auth));

        Ok(Self {
            base_url: base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/').to_string(),
            headers,
        })
    }
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn chat_url(&self, _model: &str) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn embeddings_url(&self, _model: &str) -> String {
        format!("{}/embeddings", self.base_url)
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Enterprise-hosted deployment, routed by deployment name
pub struct AzureProvider {
    endpoint: String,
    api_version: String,
    embedding_deployment: Option<String>,
    headers: HeaderMap,
}

impl AzureProvider {
    /// `api_version` of `None` selects [`DEFAULT_AZURE_API_VERSION`]
    pub fn new(
        endpoint: &str,
        api_key: &Secret<String>,
        api_version: Option<&str>,
    ) -> Result<Self> {
        let mut headers = json_headers();
        let key = HeaderValue::from_str(api_key.expose_secret().trim())
            .map_err(|_| {
                LlmError::Config("Azure API key contains invalid header characters".to_string())
            })?;
        headers.insert("api-key", sensitive(key));

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: api_version.unwrap_or(DEFAULT_AZURE_API_VERSION).to_string(),
            embedding_deployment: None,
            headers,
        })
    }

    /// Route every embedding request to a fixed deployment
    pub fn with_embedding_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.embedding_deployment = Some(deployment.into());
        self
    }

    fn deployment_url(&self, deployment: &str, path: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint,
            deployment.trim_matches('/'),
            path,
            self.api_version
        )
    }
}

impl fmt::Debug for AzureProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureProvider")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("embedding_deployment", &self.embedding_deployment)
            .finish_non_exhaustive()
    }
}

impl Provider for AzureProvider {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn chat_url(&self, model: &str) -> String {
        self.deployment_url(model, "chat/completions")
    }

    fn embeddings_url(&self, model: &str) -> String {
        let deployment = self.embedding_deployment.as_deref().unwrap_or(model);
        self.deployment_url(deployment, "embeddings")
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Provider for the configured backend
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config.backend {
        Backend::Azure => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| LlmError::Config("AZURE_OPENAI_ENDPOINT is not set".to_string()))?;
            Arc::new(AzureProvider::new(endpoint, &config.api_key, config.api_version.as_deref())?)
        }
        Backend::OpenAi => {
            Arc::new(OpenAiProvider::new(&config.api_key, config.endpoint.as_deref())?)
        }
    };

    Ok(provider)
}

/// Provider for a dedicated embedding service
pub fn embedding_service(config: &EmbeddingServiceConfig) -> Result<Arc<dyn Provider>> {
    let api_version = config.api_version.as_deref();
    let provider = AzureProvider::new(&config.endpoint, &config.api_key, api_version)?
        .with_embedding_deployment(config.deployment.clone());

    Ok(Arc::new(provider))
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn sensitive(mut value: HeaderValue) -> HeaderValue {
    value.set_sensitive(true);
    value
}
