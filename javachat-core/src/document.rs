//! Retrieved passages as seen by quality classification and prompt assembly.

use serde::{Deserialize, Serialize};

/// Read-only view over a retrieved passage.
///
/// Implemented by [`RetrievedResult`] and by richer retrieval types in
/// downstream crates so classification does not depend on their shape.
pub trait RetrievedContent {
    /// Passage text.
    fn text(&self) -> &str;

    /// Source URL used for citation, empty when unknown.
    fn source_url(&self) -> &str;
}

/// A scored passage produced by a single search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedResult {
    /// Passage text.
    pub text: String,
    /// Source URL for citation.
    pub source_url: String,
    /// Similarity score (higher is more relevant).
    pub score: f32,
}

impl RetrievedResult {
    pub fn new(text: impl Into<String>, source_url: impl Into<String>, score: f32) -> Self {
        Self { text: text.into(), source_url: source_url.into(), score }
    }
}

impl RetrievedContent for RetrievedResult {
    fn text(&self) -> &str {
        &self.text
    }

    fn source_url(&self) -> &str {
        &self.source_url
    }
}
