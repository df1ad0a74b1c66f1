//! Reranker trait for reordering and trimming retrieved documents.

use async_trait::async_trait;

use crate::document::ScoredDocument;
use crate::error::Result;

/// A reranker that re-scores retrieved documents and keeps the best `limit`.
///
/// Implementations can use cross-encoder models, LLM-based scoring, or
/// other strategies to improve precision beyond initial vector similarity.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank `documents` for `query`, returning at most `limit` of them.
    async fn rerank(
        &self,
        query: &str,
        documents: Vec<ScoredDocument>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;
}

/// Keeps the retrieval order and truncates to `limit`.
///
/// # Example
///
/// ```rust,ignore
/// use javachat_rag::{Reranker, ScoreOrderReranker};
///
/// let top = ScoreOrderReranker.rerank("query", results, 5).await?;
/// assert!(top.len() <= 5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreOrderReranker;

#[async_trait]
impl Reranker for ScoreOrderReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut documents: Vec<ScoredDocument>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        documents.truncate(limit);
        Ok(documents)
    }
}
