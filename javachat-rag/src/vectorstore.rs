//! Vector index trait for hybrid dense and sparse storage.

use async_trait::async_trait;
use javachat_core::RetrievalConstraint;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::sparse::SparseVector;

/// Point payload: allow-listed metadata plus the passage text.
pub type Payload = Map<String, Value>;

/// One point as written to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    /// UUID point id.
    pub id: String,
    /// Dense embedding stored under the dense vector slot.
    pub dense: Vec<f32>,
    /// Lexical encoding stored under the sparse slot; omitted when empty.
    pub sparse: Option<SparseVector>,
    pub payload: Payload,
}

/// Conjunction of exact `field == value` payload conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadFilter {
    must: Vec<(String, String)>,
}

impl PayloadFilter {
    /// A filter requiring `field` to equal `value`.
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self { must: vec![(field.into(), value.into())] }
    }

    /// The index-side filter for `constraint`, or `None` when it is unconstrained.
    pub fn from_constraint(constraint: &RetrievalConstraint) -> Option<Self> {
        if !constraint.has_server_side_constraint() {
            return None;
        }
        let must = constraint
            .must_match()
            .into_iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect();
        Some(Self { must })
    }

    /// `(field, value)` pairs that must all match.
    pub fn conditions(&self) -> &[(String, String)] {
        &self.must
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Evaluate the filter against a payload. Integer fields compare by their
    /// decimal representation.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|(field, expected)| match payload.get(field) {
            Some(Value::String(actual)) => actual == expected,
            Some(Value::Number(actual)) => actual.to_string() == *expected,
            _ => false,
        })
    }
}

/// A hybrid query against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    pub dense: Vec<f32>,
    /// Sparse prefetch stage; skipped when `None`.
    pub sparse: Option<SparseVector>,
    /// Applied at every stage when present.
    pub filter: Option<PayloadFilter>,
    /// Candidates per prefetch stage.
    pub prefetch_limit: usize,
    /// Final number of fused hits.
    pub limit: usize,
}

/// One hit returned by the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// A storage backend holding named collections of hybrid points.
///
/// Implementations map their native errors through
/// [`RagError::from_backend`](crate::RagError::from_backend) so the retry
/// executor can tell transient failures apart.
///
/// # Example
///
/// ```rust,ignore
/// use javachat_rag::{QdrantVectorIndex, VectorIndex};
///
/// let index = QdrantVectorIndex::from_env(&config)?;
/// index.ensure_collection("java-docs", 1536).await?;
/// index.upsert_points("java-docs", &points).await?;
/// let hits = index.query("java-docs", &query).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name used in logs and errors.
    fn backend(&self) -> &str;

    /// Create the collection with dense (cosine) and sparse slots if missing.
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()>;

    /// Insert or overwrite points by id in one call.
    async fn upsert_points(&self, collection: &str, points: &[IndexedPoint]) -> Result<()>;

    /// Delete every point matching `filter`.
    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<()>;

    /// Run a hybrid query. Hits are ordered by descending fused score.
    async fn query(&self, collection: &str, query: &HybridQuery) -> Result<Vec<IndexHit>>;
}
