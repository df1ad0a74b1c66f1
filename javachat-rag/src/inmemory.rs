//! In-memory fallback store using cosine similarity.
//!
//! [`InMemoryVectorStore`] serves the same [`Retriever`] contract as the
//! hybrid retriever when no external index is reachable. Points live in a
//! [`DashMap`], so inserts and searches may run in parallel; a search racing
//! an insert may or may not observe the new point.
//!
//! When the query itself cannot be embedded, search degrades instead of
//! failing: it logs a warning and returns up to `top_k` matching documents
//! with score 0.0 plus a notice.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::document::{Document, SearchOutcome, ScoredDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::payload::{build_payload, resolve_point_id};
use crate::retriever::{COLLECTION_KEY, Retriever, SearchRequest, require_collection};
use crate::vectorstore::{Payload, PayloadFilter};

/// Notice attached to unscored fallback results.
pub const UNSCORED_FALLBACK_NOTICE: &str =
    "Query embedding failed; returning unscored documents from the local fallback store.";

#[derive(Debug, Clone)]
struct StoredPoint {
    document: Document,
    embedding: Vec<f32>,
    payload: Payload,
}

/// An in-memory [`Retriever`] keyed by `(collection, point id)`.
///
/// # Example
///
/// ```rust,ignore
/// use javachat_rag::{HashingEmbeddingProvider, InMemoryVectorStore, Retriever};
///
/// let store = InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::default()));
/// store.upsert("java-docs", &documents, &cancel).await?;
/// ```
pub struct InMemoryVectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    points: DashMap<(String, String), StoredPoint>,
}

impl InMemoryVectorStore {
    /// Create an empty store that embeds with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, points: DashMap::new() }
    }

    /// Number of stored points across all collections.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn insert(&self, collection: &str, documents: &[Document], embeddings: Vec<Vec<f32>>) -> Result<()> {
        let ids: Vec<String> = documents.iter().map(resolve_point_id).collect::<Result<_>>()?;
        for ((document, id), embedding) in documents.iter().zip(ids).zip(embeddings) {
            let payload = build_payload(document);
            let document = Document { id: id.clone(), ..document.clone() };
            self.points
                .insert((collection.to_string(), id), StoredPoint { document, embedding, payload });
        }
        debug!(collection, count = documents.len(), "stored documents in memory");
        Ok(())
    }

    fn unscored_fallback(&self, filter: Option<&PayloadFilter>, top_k: usize) -> Vec<ScoredDocument> {
        let mut matching: Vec<ScoredDocument> = self
            .points
            .iter()
            .filter(|entry| filter.is_none_or(|f| f.matches(&entry.payload)))
            .map(|entry| ScoredDocument::new(tagged(entry.key(), &entry.document), 0.0))
            .collect();
        matching.sort_by(|a, b| a.document.id.cmp(&b.document.id));
        matching.truncate(top_k);
        matching
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn tagged(key: &(String, String), document: &Document) -> Document {
    let mut document = document.clone();
    document.metadata.insert(COLLECTION_KEY.to_string(), key.0.clone());
    document
}

#[async_trait]
impl Retriever for InMemoryVectorStore {
    async fn upsert(
        &self,
        collection: &str,
        documents: &[Document],
        _cancel: &CancellationToken,
    ) -> Result<()> {
        require_collection(collection)?;
        if documents.is_empty() {
            return Ok(());
        }
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedder.name().to_string(),
                message: format!(
                    "expected {} embeddings, received {}",
                    documents.len(),
                    embeddings.len()
                ),
            });
        }
        self.insert(collection, documents, embeddings)
    }

    async fn upsert_with_embeddings(
        &self,
        collection: &str,
        documents: &[Document],
        embeddings: &[Vec<f32>],
        _cancel: &CancellationToken,
    ) -> Result<()> {
        require_collection(collection)?;
        if documents.len() != embeddings.len() {
            return Err(RagError::InvalidArgument(format!(
                "{} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }
        self.insert(collection, documents, embeddings.to_vec())
    }

    async fn delete_by_url(
        &self,
        collection: &str,
        url: &str,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        require_collection(collection)?;
        if url.trim().is_empty() {
            return Ok(());
        }
        let before = self.points.len();
        self.points.retain(|(c, _), point| !(c == collection && point.document.url() == url));
        debug!(collection, url, removed = before.saturating_sub(self.points.len()), "deleted by url");
        Ok(())
    }

    async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome> {
        if request.query.trim().is_empty() || request.top_k == 0 {
            return Ok(SearchOutcome::empty());
        }
        if cancel.is_cancelled() {
            return Err(RagError::Cancelled { operation: "search".to_string() });
        }

        let filter = PayloadFilter::from_constraint(&request.constraint);
        let query_embedding = match self.embedder.embed(&request.query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query embedding failed, serving unscored fallback results");
                let documents = self.unscored_fallback(filter.as_ref(), request.top_k);
                return Ok(SearchOutcome {
                    documents,
                    notices: vec![UNSCORED_FALLBACK_NOTICE.to_string()],
                });
            }
        };

        let mut scored: Vec<ScoredDocument> = self
            .points
            .iter()
            .filter(|entry| filter.as_ref().is_none_or(|f| f.matches(&entry.payload)))
            .map(|entry| {
                let score = cosine_similarity(&entry.embedding, &query_embedding);
                ScoredDocument::new(tagged(entry.key(), &entry.document), score)
            })
            .filter(|scored| scored.score >= request.score_threshold)
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.document.id.cmp(&b.document.id)));
        scored.truncate(request.top_k);

        info!(result_count = scored.len(), "in-memory search completed");
        Ok(SearchOutcome { documents: scored, notices: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use javachat_core::RetrievalConstraint;

    use super::*;
    use crate::hashing::HashingEmbeddingProvider;

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::EmbeddingError { provider: "test".into(), message: "unavailable".into() })
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    fn doc(url: &str, version: &str, text: &str) -> Document {
        Document::new(text).with_metadata("url", url).with_metadata("docVersion", version)
    }

    #[tokio::test]
    async fn constraint_is_applied_by_exact_match() {
        let store = InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::new(64)));
        let cancel = CancellationToken::new();
        store
            .upsert(
                "java-docs",
                &[doc("https://a", "21", "virtual threads"), doc("https://b", "17", "virtual threads")],
                &cancel,
            )
            .await
            .unwrap();

        let request = SearchRequest::new("virtual threads")
            .constraint(RetrievalConstraint::for_doc_version("21"));
        let outcome = store.search(&request, &cancel).await.unwrap();
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.documents[0].document.url(), "https://a");
        assert_eq!(outcome.documents[0].document.metadata_value(COLLECTION_KEY), Some("java-docs"));
    }

    #[tokio::test]
    async fn embedding_failure_returns_unscored_subset() {
        let store = InMemoryVectorStore::new(Arc::new(FailingEmbedder));
        let cancel = CancellationToken::new();
        let documents = [doc("https://a", "21", "a"), doc("https://b", "21", "b"), doc("https://c", "21", "c")];
        store
            .upsert_with_embeddings("java-docs", &documents, &vec![vec![1.0, 0.0, 0.0, 0.0]; 3], &cancel)
            .await
            .unwrap();

        let outcome = store.search(&SearchRequest::new("anything").top_k(2), &cancel).await.unwrap();
        assert_eq!(outcome.len(), 2);
        assert!(outcome.documents.iter().all(|d| d.score == 0.0));
        assert_eq!(outcome.notices, vec![UNSCORED_FALLBACK_NOTICE.to_string()]);
    }

    #[tokio::test]
    async fn upsert_embedding_failure_propagates() {
        let store = InMemoryVectorStore::new(Arc::new(FailingEmbedder));
        let result = store.upsert("c", &[Document::new("x")], &CancellationToken::new()).await;
        assert!(matches!(result, Err(RagError::EmbeddingError { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn blank_collection_fails_before_embedding() {
        let store = InMemoryVectorStore::new(Arc::new(FailingEmbedder));
        let cancel = CancellationToken::new();
        let result = store.upsert(" ", &[Document::new("x")], &cancel).await;
        assert!(matches!(result, Err(RagError::InvalidArgument(_))));
        let result = store.delete_by_url("", "https://a", &cancel).await;
        assert!(matches!(result, Err(RagError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn delete_by_url_is_scoped_to_collection() {
        let store = InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::new(16)));
        let cancel = CancellationToken::new();
        store.upsert("docs", &[doc("https://a", "21", "x")], &cancel).await.unwrap();
        store.upsert("books", &[doc("https://a", "21", "x")], &cancel).await.unwrap();

        store.delete_by_url("docs", "   ", &cancel).await.unwrap();
        assert_eq!(store.len(), 2);
        store.delete_by_url("docs", "https://a", &cancel).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn same_id_overwrites_in_place() {
        let store = InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::new(16)));
        let cancel = CancellationToken::new();
        let id = "0b6f7a52-3c1e-4d8a-9f2b-5e4d3c2b1a09";
        store.upsert("docs", &[Document::new("old").with_id(id)], &cancel).await.unwrap();
        store.upsert("docs", &[Document::new("new").with_id(id)], &cancel).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
