//! Transport pair: one blocking and one non-blocking sender sharing configuration

pub mod http;
pub mod provider;

pub use http::{BlockingHttpTransport, HttpTransport};
pub use provider::{AzureProvider, OpenAiProvider, Provider};

use crate::chat::{ChatRequest, ChatResponse};
use crate::embedding::{EmbeddingRequest, EmbeddingResponse};
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Non-blocking request sender
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    /// Send one chat completion request
    async fn send_chat(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> std::result::Result<ChatResponse, TransportError>;

    /// Send one embedding request
    async fn send_embedding(
        &self,
        request: &EmbeddingRequest,
        timeout: Duration,
    ) -> std::result::Result<EmbeddingResponse, TransportError>;
}

/// Blocking request sender
pub trait BlockingTransport: Send + Sync {
    /// Send one chat completion request
    fn send_chat(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> std::result::Result<ChatResponse, TransportError>;

    /// Send one embedding request
    fn send_embedding(
        &self,
        request: &EmbeddingRequest,
        timeout: Duration,
    ) -> std::result::Result<EmbeddingResponse, TransportError>;
}

/// Long-lived blocking and non-blocking handles bound to the same backend
#[derive(Clone)]
pub struct TransportPair {
    pub blocking: Arc<dyn BlockingTransport>,
    pub non_blocking: Arc<dyn AsyncTransport>,
}

impl TransportPair {
    pub fn new(
        blocking: Arc<dyn BlockingTransport>,
        non_blocking: Arc<dyn AsyncTransport>,
    ) -> Self {
        Self { blocking, non_blocking }
    }

    /// HTTP handles for a provider; both get the proxy, or neither does
    pub fn http(provider: Arc<dyn Provider>, proxy_url: Option<&str>) -> Result<Self> {
        let blocking = BlockingHttpTransport::new(provider.clone(), proxy_url)?;
        let non_blocking = HttpTransport::new(provider.clone(), proxy_url)?;

        info!(
            provider = provider.name(),
            proxy = proxy_url.is_some(),
            "Initialized HTTP transport pair"
        );

        Ok(Self::new(Arc::new(blocking), Arc::new(non_blocking)))
    }

    /// Use one value implementing both transports for both paths
    pub fn shared<T>(transport: Arc<T>) -> Self
    where
        T: BlockingTransport + AsyncTransport + 'static,
    {
        Self {
            blocking: transport.clone(),
            non_blocking: transport,
        }
    }
}
