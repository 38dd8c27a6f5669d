//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Split `text` into pieces of at most `max_chars` characters, on char boundaries.
pub(crate) fn split_for_embedding(text: &str, max_chars: usize) -> Vec<&str> {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            pieces.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    pieces.push(&text[start..]);
    pieces
}

/// Length-weighted average of piece embeddings, re-normalized to unit length.
pub(crate) fn combine_embeddings(pieces: &[Vec<f32>], weights: &[usize]) -> Vec<f32> {
    let Some(first) = pieces.first() else {
        return Vec::new();
    };
    if pieces.len() == 1 {
        return first.clone();
    }

    let total: f32 = weights.iter().sum::<usize>() as f32;
    let mut combined = vec![0.0f32; first.len()];
    for (vector, weight) in pieces.iter().zip(weights) {
        let w = *weight as f32 / total;
        for (acc, x) in combined.iter_mut().zip(vector) {
            *acc += x * w;
        }
    }

    let norm = combined.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        combined.iter_mut().for_each(|x| *x /= norm);
    }
    combined
}
