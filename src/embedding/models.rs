//! Data models for embedding requests and responses

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request to generate embeddings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRequest {
    /// Input text(s) to embed
    pub input: EmbeddingInput,

    /// Model name
    pub model: String,
}

/// Input variants for embedding requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

/// Response from embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Generated embeddings
    pub data: Vec<EmbeddingData>,

    /// Model used for generation
    #[serde(default)]
    pub model: Option<String>,

    /// Usage statistics
    #[serde(default)]
    pub usage: Option<UsageStats>,
}

/// Individual embedding data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Index in the batch
    #[serde(default)]
    pub index: usize,

    /// Object type (always "embedding")
    #[serde(default)]
    pub object: String,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: usize,

    /// Total tokens used
    pub total_tokens: usize,
}

/// Per-call overrides for embedding requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedOptions {
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

impl EmbedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Vectors returned by an embedding call
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    /// Exactly one vector came back
    Single(Vec<f32>),

    /// Several vectors, index-aligned with the inputs
    Batch(Vec<Vec<f32>>),
}

impl EmbeddingRequest {
    /// Create a request for a single text
    pub fn single(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            input: EmbeddingInput::Single(text.into()),
            model: model.into(),
        }
    }

    /// Create a request for multiple texts
    pub fn batch(texts: Vec<String>, model: impl Into<String>) -> Self {
        Self {
            input: EmbeddingInput::Batch(texts),
            model: model.into(),
        }
    }
}

impl EmbeddingInput {
    /// Number of texts carried
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for EmbeddingInput {
    fn from(text: String) -> Self {
        EmbeddingInput::Single(text)
    }
}

impl From<&str> for EmbeddingInput {
    fn from(text: &str) -> Self {
        EmbeddingInput::Single(text.to_string())
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(texts: Vec<String>) -> Self {
        EmbeddingInput::Batch(texts)
    }
}

impl From<&[String]> for EmbeddingInput {
    fn from(texts: &[String]) -> Self {
        EmbeddingInput::Batch(texts.to_vec())
    }
}

impl From<Vec<&str>> for EmbeddingInput {
    fn from(texts: Vec<&str>) -> Self {
        EmbeddingInput::Batch(texts.into_iter().map(str::to_string).collect())
    }
}

impl EmbeddingResponse {
    /// Vectors ordered by their batch index
    pub fn into_vectors(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|entry| entry.index);
        self.data.into_iter().map(|entry| entry.embedding).collect()
    }
}

impl Embedding {
    /// Zero vectors is absent, one is bare, more is an ordered list
    pub fn from_vectors(mut vectors: Vec<Vec<f32>>) -> Option<Self> {
        match vectors.len() {
            0 => None,
            1 => vectors.pop().map(Embedding::Single),
            _ => Some(Embedding::Batch(vectors)),
        }
    }

    /// Number of vectors held
    pub fn len(&self) -> usize {
        match self {
            Embedding::Single(_) => 1,
            Embedding::Batch(vectors) => vectors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_single(&self) -> Option<&[f32]> {
        match self {
            Embedding::Single(vector) => Some(vector),
            Embedding::Batch(_) => None,
        }
    }

    /// Flatten into a list regardless of cardinality
    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Embedding::Single(vector) => vec![vector],
            Embedding::Batch(vectors) => vectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vectors(n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![i as f32, 1.0]).collect()
    }

    #[test]
    fn test_cardinality_law() {
        assert_eq!(Embedding::from_vectors(vectors(0)), None);
        assert_eq!(Embedding::from_vectors(vectors(1)), Some(Embedding::Single(vec![0.0, 1.0])));

        for n in [2, 10, 11, 25] {
            match Embedding::from_vectors(vectors(n)) {
                Some(Embedding::Batch(batch)) => assert_eq!(batch, vectors(n)),
                other => panic!("expected batch of {}, got {:?}", n, other),
            }
        }
    }

    #[test]
    fn test_input_wire_format() {
        let single = EmbeddingRequest::single("hello", "text-embedding-3-large");
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({"input": "hello", "model": "text-embedding-3-large"})
        );

        let batch = EmbeddingRequest::batch(vec!["a".to_string(), "b".to_string()], "m");
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({"input": ["a", "b"], "model": "m"})
        );
    }

    #[test]
    fn test_response_sorted_by_index() {
        let response: EmbeddingResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [2.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0]}
            ],
            "model": "text-embedding-3-large",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        }))
        .unwrap();

        assert_eq!(response.into_vectors(), vec![vec![1.0], vec![2.0]]);
    }
}
