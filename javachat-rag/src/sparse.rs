//! Lexical sparse encoding for the hybrid index.
//!
//! Text is lower-cased and split into alphanumeric tokens. Each token is
//! feature-hashed to a 32-bit index and weighted by its term frequency; the
//! index applies IDF on its side.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{RagError, Result};

/// Tokens shorter than this are ignored.
pub const MIN_TOKEN_LENGTH: usize = 2;

/// Maximum number of distinct indices kept per vector.
pub const MAX_UNIQUE_TOKENS: usize = 256;

/// Parallel index/value lists with ascending, unique indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Build a sparse vector from parallel lists.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if the lists differ in length.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(RagError::InvalidArgument(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        Ok(Self { indices, values })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

/// Produces a lexical sparse vector for a passage or query.
pub trait SparseEncoder: Send + Sync {
    fn encode(&self, text: &str) -> SparseVector;
}

/// Term-frequency encoder over hashed lower-cased tokens.
#[derive(Debug, Clone, Copy)]
pub struct LexicalSparseEncoder {
    max_unique_tokens: usize,
}

impl Default for LexicalSparseEncoder {
    fn default() -> Self {
        Self { max_unique_tokens: MAX_UNIQUE_TOKENS }
    }
}

impl LexicalSparseEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of distinct indices per vector.
    pub fn with_max_unique_tokens(mut self, max_unique_tokens: usize) -> Self {
        self.max_unique_tokens = max_unique_tokens;
        self
    }
}

impl SparseEncoder for LexicalSparseEncoder {
    fn encode(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token_index(&token)).or_default() += 1;
        }
        if counts.is_empty() {
            return SparseVector::empty();
        }

        let mut by_weight: Vec<(u32, u32)> = counts.into_iter().collect();
        // Highest counts first; ties broken by index for determinism.
        by_weight.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        by_weight.truncate(self.max_unique_tokens);
        by_weight.sort_unstable_by_key(|(index, _)| *index);

        let (indices, values) =
            by_weight.into_iter().map(|(index, count)| (index, count as f32)).unzip();
        SparseVector { indices, values }
    }
}

/// Lower-cased alphanumeric tokens of at least [`MIN_TOKEN_LENGTH`] characters.
pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LENGTH)
        .map(str::to_lowercase)
}

/// 32-bit feature-hash bucket for a token.
pub(crate) fn token_index(token: &str) -> u32 {
    xxh3_64(token.as_bytes()) as u32
}
