//! Vector similarity

use crate::error::{LlmError, Result};

/// Cosine similarity of two vectors, in [-1, 1].
///
/// Fails on mismatched lengths or a zero-magnitude vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(LlmError::InvalidInput(format!(
            "Vector dimensions differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(LlmError::InvalidInput(
            "Cosine similarity is undefined for a zero-magnitude vector".to_string()
        ));
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
