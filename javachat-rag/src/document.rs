//! Data types for indexed documents and search results.

use std::collections::HashMap;

use javachat_core::{RetrievedContent, RetrievedResult};
use serde::{Deserialize, Serialize};

/// Metadata key holding a document's source URL.
pub const URL_KEY: &str = "url";
/// Metadata key holding a document's title.
pub const TITLE_KEY: &str = "title";
/// Metadata key holding a content hash used for de-duplication.
pub const HASH_KEY: &str = "hash";

/// A passage of reference documentation with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    /// Stable point id (a UUID). Blank means "generate one on upsert".
    #[serde(default)]
    pub id: String,
    /// The passage text.
    pub text: String,
    /// Key-value metadata such as `url`, `title`, `docVersion`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document without an id.
    pub fn new(text: impl Into<String>) -> Self {
        Self { id: String::new(), text: text.into(), metadata: HashMap::new() }
    }

    /// Set the point id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Source URL, empty when unknown.
    pub fn url(&self) -> &str {
        self.metadata_value(URL_KEY).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.metadata_value(TITLE_KEY).unwrap_or_default()
    }
}

/// A retrieved [`Document`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDocument {
    /// The retrieved document.
    pub document: Document,
    /// Similarity score (higher is more relevant). Unscored fallbacks use 0.0.
    pub score: f32,
}

impl ScoredDocument {
    pub fn new(document: Document, score: f32) -> Self {
        Self { document, score }
    }

    /// Flatten into the core result type.
    pub fn to_retrieved_result(&self) -> RetrievedResult {
        RetrievedResult::new(self.document.text.clone(), self.document.url(), self.score)
    }
}

impl RetrievedContent for ScoredDocument {
    fn text(&self) -> &str {
        &self.document.text
    }

    fn source_url(&self) -> &str {
        self.document.url()
    }
}

/// Documents returned by a search plus any degradation notices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Results ordered by descending score.
    pub documents: Vec<ScoredDocument>,
    /// Human-readable notes about partial failures or fallbacks.
    pub notices: Vec<String>,
}

impl SearchOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}
