//! Error types for the LLM client core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Main error type for the client core
#[derive(Error, Debug)]
pub enum LlmError {
    /// Missing or invalid configuration value. Raised at construction, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed caller input. Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to read image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A transport failure that outlived the retry budget
    #[error("{model} request failed after {attempts} attempts: {source}")]
    Exhausted {
        model: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

/// Errors raised by a single outbound request
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<config::ConfigError> for LlmError {
    fn from(err: config::ConfigError) -> Self {
        LlmError::Config(err.to_string())
    }
}
