//! Offline embedding provider based on token feature hashing.
//!
//! Useful for development, tests and the CLI where no embedding service is
//! reachable. Texts that share tokens have positive cosine similarity.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::sparse::{token_index, tokenize};

/// Deterministic, L2-normalised bag-of-tokens embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(RagError::EmbeddingError {
                provider: self.name().to_string(),
                message: "dimensions must be greater than zero".to_string(),
            });
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let index = token_index(&token);
            let slot = index as usize % self.dimensions;
            // High bit picks the sign so unrelated tokens tend to cancel.
            let sign = if index & 0x8000_0000 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn embeddings_are_normalised_and_deterministic() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed("virtual threads in Java 21").await.unwrap();
        let b = provider.embed("virtual threads in Java 21").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_is_zero_vector() {
        let provider = HashingEmbeddingProvider::new(8);
        assert!(provider.embed("").await.unwrap().iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn zero_dimensions_is_an_error() {
        let provider = HashingEmbeddingProvider::new(0);
        assert!(matches!(provider.embed("x").await, Err(RagError::EmbeddingError { .. })));
    }

    #[tokio::test]
    async fn batch_is_index_aligned() {
        let provider = HashingEmbeddingProvider::new(32);
        let batch = provider.embed_batch(&["records", "streams"]).await.unwrap();
        assert_eq!(batch[0], provider.embed("records").await.unwrap());
        assert_eq!(batch[1], provider.embed("streams").await.unwrap());
    }
}
