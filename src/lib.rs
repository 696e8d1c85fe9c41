//! Resilient LLM client - chat completions and embeddings over hosted OpenAI-compatible APIs
//!
//! This library is the client core of a research-idea generation pipeline. It
//! resolves which backend to talk to, builds a blocking and a non-blocking
//! transport over the same settings, and wraps every outbound call in one fixed
//! retry policy.
//!
//! ## Features
//!
//! - **Two backends**: direct hosted API or an enterprise (Azure) deployment
//! - **Dual execution paths**: `respond`/`embed` block, `respond_async`/`embed_async` yield
//! - **Fixed-interval retries**: 10 attempts, 10 seconds apart, on every call
//! - **Chunked embeddings**: batches over 10 texts are split and reassembled in order
//! - **Typed failure policy**: absorb exhausted calls into `Ok(None)` or propagate them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resilient_llm::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = LlmClient::from_env()?;
//!
//!     let answer = client
//!         .respond_async(
//!             &[Message::user("Name one open problem in urban planning")],
//!             &ChatOptions::new(),
//!         )
//!         .await?;
//!
//!     let vectors = client
//!         .embed_async(vec!["road layout", "diffusion models"], &EmbedOptions::new())
//!         .await?;
//!
//!     println!("{:?} {:?}", answer, vectors.map(|v| v.len()));
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod retry;
pub mod text;
pub mod transport;

pub use client::LlmClient;
pub use config::LlmConfig;
pub use error::{LlmError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::chat::{ChatOptions, ContentPart, Message, Role};
    pub use crate::client::LlmClient;
    pub use crate::config::{Backend, FailureMode, LlmConfig};
    pub use crate::embedding::{cosine_similarity, EmbedOptions, Embedding, EmbeddingInput};
    pub use crate::error::{LlmError, Result};
    pub use crate::retry::RetryPolicy;
    pub use crate::text::extract_between;
    pub use crate::transport::{AsyncTransport, BlockingTransport, TransportPair};
}
