//! Embedding request planning, result shaping and similarity

pub mod models;
pub mod similarity;

pub use models::{
    EmbedOptions, Embedding, EmbeddingData, EmbeddingInput, EmbeddingRequest, EmbeddingResponse,
    UsageStats,
};
pub use similarity::cosine_similarity;

/// Maximum number of texts per outbound embedding request
pub const MAX_BATCH_SIZE: usize = 10;

/// Split an input into the requests that will be issued, in order.
///
/// A single text or a batch of up to [`MAX_BATCH_SIZE`] texts becomes one request;
/// larger batches become contiguous chunks, the last one possibly shorter.
/// An empty batch yields no requests.
pub fn plan_requests(input: EmbeddingInput, model: &str) -> Vec<EmbeddingRequest> {
    match input {
        EmbeddingInput::Single(text) => vec![EmbeddingRequest::single(text, model)],
        EmbeddingInput::Batch(texts) if texts.is_empty() => Vec::new(),
        EmbeddingInput::Batch(texts) => texts
            .chunks(MAX_BATCH_SIZE)
            .map(|chunk| EmbeddingRequest::batch(chunk.to_vec(), model))
            .collect(),
    }
}
