//! Hybrid retrieval over every configured collection.
//!
//! [`HybridRetriever`] owns the write path (embed, sparse-encode, upsert) and
//! the read path (embed query, fan out over collections, fuse, rank) against
//! a [`VectorIndex`]. Every index and embedding call runs under the injected
//! [`RetryExecutor`] with the per-operation deadline from [`RetrievalConfig`].
//!
//! # Example
//!
//! ```rust,ignore
//! use javachat_rag::{HybridRetriever, RetrievalConfig, SearchRequest};
//!
//! let retriever = HybridRetriever::new(config, embedder, sparse_encoder, index);
//! retriever.upsert("java-docs", &documents, &cancel).await?;
//!
//! let request = SearchRequest::new("What's new in Java 25?")
//!     .constraint(RetrievalConstraint::for_doc_version("25"));
//! let outcome = retriever.search(&request, &cancel).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use javachat_core::RetrievalConstraint;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::RetrievalConfig;
use crate::document::{Document, SearchOutcome, ScoredDocument, URL_KEY};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::payload::{build_payload, document_from_hit, resolve_point_id};
use crate::retry::{BackoffRetryExecutor, RetryExecutor};
use crate::sparse::SparseEncoder;
use crate::vectorstore::{HybridQuery, IndexHit, IndexedPoint, PayloadFilter, VectorIndex};

/// Metadata key recording which collection a hit came from.
pub const COLLECTION_KEY: &str = "collection";

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Text to embed. May differ from the user's wording (e.g. version-boosted).
    pub query: String,
    pub constraint: RetrievalConstraint,
    pub top_k: usize,
    /// Hits scoring below this are dropped.
    pub score_threshold: f32,
}

impl SearchRequest {
    /// A request with no constraint, `top_k` 10 and no threshold.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            constraint: RetrievalConstraint::none(),
            top_k: 10,
            score_threshold: f32::MIN,
        }
    }

    pub fn constraint(mut self, constraint: RetrievalConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }
}

/// Write and read contract shared by the hybrid retriever and the in-memory
/// fallback store.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Embed and store `documents`, overwriting points with the same id.
    async fn upsert(
        &self,
        collection: &str,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Store `documents` with caller-supplied dense vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] without touching the index if the
    /// two lists differ in length.
    async fn upsert_with_embeddings(
        &self,
        collection: &str,
        documents: &[Document],
        embeddings: &[Vec<f32>],
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Delete every point whose `url` equals `url`. Blank URLs are a no-op.
    async fn delete_by_url(&self, collection: &str, url: &str, cancel: &CancellationToken)
    -> Result<()>;

    /// Return at most `top_k` documents at or above the threshold, best first.
    async fn search(&self, request: &SearchRequest, cancel: &CancellationToken)
    -> Result<SearchOutcome>;
}

/// [`Retriever`] backed by a dense + sparse [`VectorIndex`].
pub struct HybridRetriever<R = BackoffRetryExecutor> {
    config: RetrievalConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    sparse_encoder: Arc<dyn SparseEncoder>,
    index: Arc<dyn VectorIndex>,
    retry: R,
}

impl HybridRetriever {
    /// Create a retriever using the backoff policy from `config.retry`.
    pub fn new(
        config: RetrievalConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        sparse_encoder: Arc<dyn SparseEncoder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let retry = BackoffRetryExecutor::new(config.retry.clone());
        Self { config, embedder, sparse_encoder, index, retry }
    }
}

impl<R: RetryExecutor> HybridRetriever<R> {
    /// Replace the retry executor.
    pub fn with_retry_executor<R2: RetryExecutor>(self, retry: R2) -> HybridRetriever<R2> {
        HybridRetriever {
            config: self.config,
            embedder: self.embedder,
            sparse_encoder: self.sparse_encoder,
            index: self.index,
            retry,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Create every configured collection that does not exist yet.
    pub async fn ensure_collections(&self, cancel: &CancellationToken) -> Result<()> {
        let dimensions = self.embedder.dimensions();
        for collection in self.config.collections.all() {
            self.retry
                .execute("ensure_collection", self.config.upsert_timeout, cancel, || {
                    self.index.ensure_collection(collection, dimensions)
                })
                .await?;
        }
        Ok(())
    }

    async fn write_points(
        &self,
        collection: &str,
        documents: &[Document],
        ids: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
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

        let points: Vec<IndexedPoint> = documents
            .iter()
            .zip(ids)
            .zip(embeddings)
            .map(|((document, id), dense)| {
                let sparse = self.sparse_encoder.encode(&document.text);
                IndexedPoint {
                    id,
                    dense,
                    sparse: (!sparse.is_empty()).then_some(sparse),
                    payload: build_payload(document),
                }
            })
            .collect();

        self.retry
            .execute("upsert", self.config.upsert_timeout, cancel, || {
                self.index.upsert_points(collection, &points)
            })
            .await?;

        info!(collection, count = points.len(), backend = self.index.backend(), "upserted documents");
        Ok(())
    }

    async fn search_collection(
        &self,
        collection: &str,
        query: &HybridQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<IndexHit>> {
        self.retry
            .execute("search", self.config.search_timeout, cancel, || {
                self.index.query(collection, query)
            })
            .await
    }
}

/// Reject a blank collection name before any embedding or index call.
pub(crate) fn require_collection(collection: &str) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(RagError::InvalidArgument("collection name must not be blank".to_string()));
    }
    Ok(())
}

fn resolve_ids(documents: &[Document]) -> Result<Vec<String>> {
    documents.iter().map(resolve_point_id).collect()
}

#[async_trait]
impl<R: RetryExecutor> Retriever for HybridRetriever<R> {
    async fn upsert(
        &self,
        collection: &str,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<()> {
        require_collection(collection)?;
        if documents.is_empty() {
            return Ok(());
        }
        let ids = resolve_ids(documents)?;
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();

        let embeddings = self
            .retry
            .execute("embed_batch", self.config.upsert_timeout, cancel, || {
                self.embedder.embed_batch(&texts)
            })
            .await?;

        self.write_points(collection, documents, ids, embeddings, cancel).await
    }

    async fn upsert_with_embeddings(
        &self,
        collection: &str,
        documents: &[Document],
        embeddings: &[Vec<f32>],
        cancel: &CancellationToken,
    ) -> Result<()> {
        require_collection(collection)?;
        if documents.len() != embeddings.len() {
            return Err(RagError::InvalidArgument(format!(
                "{} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }
        if documents.is_empty() {
            return Ok(());
        }
        let ids = resolve_ids(documents)?;
        self.write_points(collection, documents, ids, embeddings.to_vec(), cancel).await
    }

    async fn delete_by_url(
        &self,
        collection: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        require_collection(collection)?;
        if url.trim().is_empty() {
            return Ok(());
        }
        let filter = PayloadFilter::field_equals(URL_KEY, url);
        self.retry
            .execute("delete", self.config.delete_timeout, cancel, || {
                self.index.delete_by_filter(collection, &filter)
            })
            .await?;
        info!(collection, url, "deleted points by url");
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

        let dense = self
            .retry
            .execute("embed_query", self.config.search_timeout, cancel, || {
                self.embedder.embed(&request.query)
            })
            .await?;
        let sparse = self.sparse_encoder.encode(&request.query);
        let query = HybridQuery {
            dense,
            sparse: (!sparse.is_empty()).then_some(sparse),
            filter: PayloadFilter::from_constraint(&request.constraint),
            prefetch_limit: self.config.prefetch_limit.max(request.top_k),
            limit: request.top_k,
        };

        let collections = self.config.collections.all();
        let results = join_all(collections.iter().map(|collection| {
            let query = &query;
            async move { (*collection, self.search_collection(collection, query, cancel).await) }
        }))
        .await;

        let mut best: HashMap<String, (IndexHit, &str)> = HashMap::new();
        let mut notices = Vec::new();
        let mut failures = Vec::new();

        for (collection, result) in results {
            match result {
                Ok(hits) => {
                    debug!(collection, count = hits.len(), "collection search completed");
                    for hit in hits {
                        match best.get(&hit.id) {
                            Some((existing, _)) if existing.score >= hit.score => {}
                            _ => {
                                best.insert(hit.id.clone(), (hit, collection));
                            }
                        }
                    }
                }
                Err(e @ RagError::Cancelled { .. }) => return Err(e),
                Err(e) => {
                    warn!(collection, error = %e, "collection search failed");
                    notices.push(format!("Search of collection '{collection}' failed: {e}"));
                    failures.push((collection, e));
                }
            }
        }

        if !failures.is_empty() && self.config.fail_on_partial_search_error {
            let detail = failures
                .iter()
                .map(|(collection, e)| format!("{collection}: {e}"))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(match failures.into_iter().next() {
                Some((_, e)) if e.is_transient() => RagError::Transport {
                    backend: self.index.backend().to_string(),
                    message: format!("hybrid search failed for {detail}"),
                },
                _ => RagError::VectorStoreError {
                    backend: self.index.backend().to_string(),
                    message: format!("hybrid search failed for {detail}"),
                },
            });
        }

        let mut documents: Vec<ScoredDocument> = best
            .into_values()
            .filter(|(hit, _)| hit.score >= request.score_threshold)
            .map(|(hit, collection)| {
                let mut document = document_from_hit(&hit);
                document.metadata.insert(COLLECTION_KEY.to_string(), collection.to_string());
                ScoredDocument::new(document, hit.score)
            })
            .collect();
        documents.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        documents.truncate(request.top_k);

        info!(
            result_count = documents.len(),
            collections = collections.len(),
            failed = notices.len(),
            "hybrid search completed"
        );
        Ok(SearchOutcome { documents, notices })
    }
}
