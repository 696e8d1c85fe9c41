//! reqwest-backed transports

use super::provider::Provider;
use super::{AsyncTransport, BlockingTransport};
use crate::chat::{ChatRequest, ChatResponse};
use crate::embedding::{EmbeddingRequest, EmbeddingResponse};
use crate::error::{LlmError, Result, TransportError};
use async_trait::async_trait;
use reqwest::{Proxy, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Non-blocking transport over `reqwest::Client`
#[derive(Debug)]
pub struct HttpTransport {
    provider: Arc<dyn Provider>,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(provider: Arc<dyn Provider>, proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = proxy(proxy_url)? {
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { provider, client })
    }

    /// Wrap an existing client
    pub fn with_client(provider: Arc<dyn Provider>, client: reqwest::Client) -> Self {
        Self { provider, client }
    }

    async fn post<B, T>(
        &self,
        url: String,
        body: &B,
        timeout: Duration,
    ) -> std::result::Result<T, TransportError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!(provider = self.provider.name(), %url, "Sending API request");

        let response = self
            .client
            .post(&url)
            .headers(self.provider.headers().clone())
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        decode(status, text)
    }
}

#[async_trait]
impl AsyncTransport for HttpTransport {
    async fn send_chat(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> std::result::Result<ChatResponse, TransportError> {
        let url = self.provider.chat_url(&request.model);
        self.post(url, request, timeout).await
    }

    async fn send_embedding(
        &self,
        request: &EmbeddingRequest,
        timeout: Duration,
    ) -> std::result::Result<EmbeddingResponse, TransportError> {
        let url = self.provider.embeddings_url(&request.model);
        self.post(url, request, timeout).await
    }
}

/// Blocking transport over `reqwest::blocking::Client`
#[derive(Debug)]
pub struct BlockingHttpTransport {
    provider: Arc<dyn Provider>,
    client: reqwest::blocking::Client,
}

impl BlockingHttpTransport {
    pub fn new(provider: Arc<dyn Provider>, proxy_url: Option<&str>) -> Result<Self> {
        let proxy = proxy(proxy_url)?;

        // The blocking client owns an internal runtime and must not be built on an async worker
        let client = std::thread::spawn(move || {
            let mut builder = reqwest::blocking::Client::builder();
            if let Some(proxy) = proxy {
                builder = builder.proxy(proxy);
            }
            builder.build()
        })
        .join()
        .map_err(|_| LlmError::Config("Blocking HTTP client builder panicked".to_string()))?
        .map_err(|e| LlmError::Config(format!("Failed to build blocking HTTP client: {}", e)))?;

        Ok(Self { provider, client })
    }

    /// Wrap an existing blocking client
    pub fn with_client(provider: Arc<dyn Provider>, client: reqwest::blocking::Client) -> Self {
        Self { provider, client }
    }

    fn post<B, T>(
        &self,
        url: String,
        body: &B,
        timeout: Duration,
    ) -> std::result::Result<T, TransportError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        debug!(provider = self.provider.name(), %url, "Sending blocking API request");

        let response = self
            .client
            .post(&url)
            .headers(self.provider.headers().clone())
            .timeout(timeout)
            .json(body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        decode(status, text)
    }
}

impl BlockingTransport for BlockingHttpTransport {
    fn send_chat(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> std::result::Result<ChatResponse, TransportError> {
        let url = self.provider.chat_url(&request.model);
        self.post(url, request, timeout)
    }

    fn send_embedding(
        &self,
        request: &EmbeddingRequest,
        timeout: Duration,
    ) -> std::result::Result<EmbeddingResponse, TransportError> {
        let url = self.provider.embeddings_url(&request.model);
        self.post(url, request, timeout)
    }
}

fn proxy(proxy_url: Option<&str>) -> Result<Option<Proxy>> {
    proxy_url
        .map(|url| {
            Proxy::all(url)
                .map_err(|e| LlmError::Config(format!("Invalid proxy URL {}: {}", url, e)))
        })
        .transpose()
}

fn decode<T: DeserializeOwned>(
    status: StatusCode,
    body: String,
) -> std::result::Result<T, TransportError> {
    if !status.is_success() {
        debug!(status = status.as_u16(), "API returned error status");
        return Err(TransportError::Api {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
