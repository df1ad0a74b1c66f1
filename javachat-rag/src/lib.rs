//! # javachat-rag
//!
//! Version-aware hybrid retrieval over Java documentation, feeding a
//! token-budgeted prompt.
//!
//! ## Overview
//!
//! - [`HybridRetriever`] - embeds, sparse-encodes and upserts documents, and
//!   runs fused dense + sparse searches across every configured collection
//! - [`InMemoryVectorStore`] - fallback [`Retriever`] with cosine similarity
//! - [`PromptPipeline`] - query analysis, retrieval, quality classification
//!   and prompt truncation for one chat turn
//! - [`RetryExecutor`] - deadline, backoff and cancellation around every
//!   remote call
//!
//! ## Features
//!
//! - `openai` - [`OpenAIEmbeddingProvider`](openai::OpenAIEmbeddingProvider)
//!   for OpenAI-compatible embedding endpoints
//! - `qdrant` - [`QdrantVectorIndex`](qdrant::QdrantVectorIndex)
//! - `full` - everything
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use javachat_rag::*;
//!
//! let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::default())));
//! store.upsert("java-docs", &documents, &CancellationToken::new()).await?;
//!
//! let pipeline = PromptPipeline::builder().retriever(store).build()?;
//! let prepared = pipeline
//!     .prepare(&PromptRequest::new("What's new in Java 25?"), &CancellationToken::new())
//!     .await?;
//! ```

pub mod cancel;
pub mod collection;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod inmemory;
pub mod payload;
pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod retry;
pub mod sparse;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use cancel::CancellationToken;
pub use collection::CollectionKind;
pub use config::{
    CollectionNames, PromptConfig, RetrievalConfig, RetrievalConfigBuilder, RetrySettings,
    SystemPromptTemplate,
};
pub use document::{Document, ScoredDocument, SearchOutcome};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::HashingEmbeddingProvider;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{
    HistoryTurn, PreparedPrompt, PromptPipeline, PromptPipelineBuilder, PromptRequest,
};
pub use reranker::{Reranker, ScoreOrderReranker};
pub use retriever::{HybridRetriever, Retriever, SearchRequest};
pub use retry::{BackoffRetryExecutor, RetryExecutor};
pub use sparse::{LexicalSparseEncoder, SparseEncoder, SparseVector};
pub use vectorstore::{HybridQuery, IndexHit, IndexedPoint, PayloadFilter, VectorIndex};

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorIndex;
