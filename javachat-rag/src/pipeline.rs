//! Retrieval-to-prompt orchestrator.
//!
//! The [`PromptPipeline`] runs one chat turn from raw query to rendered
//! prompt: version analysis, constrained search, de-duplication, reranking,
//! quality classification, segment assembly and budget truncation. It never
//! calls a completion model.
//!
//! # Example
//!
//! ```rust,ignore
//! use javachat_rag::{PromptPipeline, PromptRequest, RetrievalConfig};
//!
//! let pipeline = PromptPipeline::builder()
//!     .retrieval_config(RetrievalConfig::default())
//!     .retriever(Arc::new(retriever))
//!     .build()?;
//!
//! let prepared = pipeline
//!     .prepare(&PromptRequest::new("How do records work in Java 21?"), &cancel)
//!     .await?;
//! println!("{}", prepared.rendered);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use javachat_core::prompt::TRUNCATION_NOTICE;
use javachat_core::tokens::ESTIMATED_CHARS_PER_TOKEN;
use javachat_core::{
    ContextDocumentSegment, ConversationTurnSegment, CurrentQuerySegment, RetrievalConstraint,
    Role, SearchQualityLevel, StructuredPrompt, SystemSegment, version,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::config::{PromptConfig, RetrievalConfig};
use crate::document::{HASH_KEY, ScoredDocument};
use crate::error::{RagError, Result};
use crate::reranker::{Reranker, ScoreOrderReranker};
use crate::retriever::{Retriever, SearchRequest};

/// Marker appended to a passage shortened to its per-document token limit.
pub const DOCUMENT_TRUNCATION_MARKER: &str = "\n[...content truncated for token limits...]";

/// Fraction of the character limit a sentence or line break must reach to be
/// used as the cut point.
const BREAK_POINT_THRESHOLD: f64 = 0.8;

/// One past message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub text: String,
}

impl HistoryTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into() }
    }
}

/// Input for one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// The user's latest message.
    pub query: String,
    /// Earlier turns, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    /// Overrides [`PromptConfig::token_budget`].
    #[serde(default)]
    pub token_budget: Option<usize>,
    /// Caps the number of context documents below `return_k`.
    #[serde(default)]
    pub max_documents: Option<usize>,
    /// Shortens each context passage to roughly this many tokens.
    #[serde(default)]
    pub max_document_tokens: Option<usize>,
}

impl PromptRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            token_budget: None,
            max_documents: None,
            max_document_tokens: None,
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = Some(budget);
        self
    }

    /// Retrieval limits for token-constrained models.
    pub fn with_document_limits(mut self, max_documents: usize, max_document_tokens: usize) -> Self {
        self.max_documents = Some(max_documents);
        self.max_document_tokens = Some(max_document_tokens);
        self
    }
}

/// Everything the completion caller needs for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedPrompt {
    /// The flat prompt string.
    pub rendered: String,
    pub quality: SearchQualityLevel,
    pub quality_note: String,
    /// Source URLs of the surviving context documents, in `[CTX n]` order.
    pub citations: Vec<String>,
    /// Estimated tokens of the surviving segments.
    pub total_tokens: usize,
    pub token_budget: usize,
    pub was_truncated: bool,
    /// Degradation notices from retrieval.
    pub notices: Vec<String>,
    /// The documents that were offered to the prompt, before truncation.
    pub documents: Vec<ScoredDocument>,
}

/// Version-aware retrieval followed by prompt assembly.
///
/// Construct one via [`PromptPipeline::builder()`].
pub struct PromptPipeline {
    retrieval: RetrievalConfig,
    prompt: PromptConfig,
    retriever: Arc<dyn Retriever>,
    reranker: Arc<dyn Reranker>,
}

impl PromptPipeline {
    /// Create a new [`PromptPipelineBuilder`].
    pub fn builder() -> PromptPipelineBuilder {
        PromptPipelineBuilder::default()
    }

    pub fn retrieval_config(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    pub fn prompt_config(&self) -> &PromptConfig {
        &self.prompt
    }

    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    /// Retrieve context for `query`: blank queries retrieve nothing; explicit
    /// versions constrain the search and boost the embedded text.
    ///
    /// # Errors
    ///
    /// Propagates retriever and reranker failures.
    pub async fn retrieve(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<(Vec<ScoredDocument>, Vec<String>)> {
        if query.trim().is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let patterns = version::extract_filter_patterns(query);
        let constraint = RetrievalConstraint::from_version_patterns(patterns.as_ref());
        if let Some(patterns) = &patterns {
            debug!(version = patterns.version_number(), "constraining retrieval to doc version");
        }

        let request = SearchRequest::new(version::boost_query_with_version_context(query))
            .constraint(constraint)
            .top_k(self.retrieval.top_k)
            .score_threshold(self.retrieval.score_threshold);

        let outcome = self.retriever.search(&request, cancel).await.inspect_err(|e| {
            error!(error = %e, "retrieval failed");
        })?;
        for notice in &outcome.notices {
            warn!(notice = %notice, "retrieval degraded");
        }

        let unique = dedupe_by_hash_then_url(outcome.documents);
        let reranked = self.reranker.rerank(query, unique, self.retrieval.return_k).await.map_err(|e| {
            error!(error = %e, "reranking failed");
            RagError::PipelineError(format!("reranking failed: {e}"))
        })?;

        Ok((reranked, outcome.notices))
    }

    /// Run the full turn and render the prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] before retrieval when a document
    /// limit is zero. Propagates retrieval failures; classification and
    /// truncation never fail.
    pub async fn prepare(
        &self,
        request: &PromptRequest,
        cancel: &CancellationToken,
    ) -> Result<PreparedPrompt> {
        if request.max_documents == Some(0) {
            return Err(RagError::ConfigError("max_documents must be greater than zero".to_string()));
        }
        if request.max_document_tokens == Some(0) {
            return Err(RagError::ConfigError(
                "max_document_tokens must be greater than zero".to_string(),
            ));
        }

        let (mut documents, notices) = self.retrieve(&request.query, cancel).await?;
        if let Some(max_documents) = request.max_documents {
            documents.truncate(max_documents);
        }
        if let Some(max_tokens) = request.max_document_tokens {
            for scored in &mut documents {
                scored.document.text = truncate_to_token_limit(&scored.document.text, max_tokens);
            }
        }

        let (quality, quality_note) = SearchQualityLevel::describe(&documents);
        let system_text = self.prompt.system.render(&quality_note, quality.is_low_confidence());

        let context_documents = documents
            .iter()
            .enumerate()
            .map(|(i, scored)| {
                ContextDocumentSegment::new(i + 1, scored.document.url(), scored.document.text.clone())
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let conversation_history = request
            .history
            .iter()
            .map(|turn| ConversationTurnSegment::new(turn.role, turn.text.clone()))
            .collect();

        let prompt = StructuredPrompt::new(
            SystemSegment::new(system_text),
            context_documents,
            conversation_history,
            CurrentQuerySegment::new(request.query.clone()),
        );

        let token_budget = request.token_budget.unwrap_or(self.prompt.token_budget);
        let truncated = prompt.truncate(token_budget);
        let rendered = truncated.render();
        let citations =
            truncated.prompt().citations().into_iter().map(str::to_string).collect::<Vec<_>>();

        info!(
            quality = %quality,
            documents = documents.len(),
            citations = citations.len(),
            total_tokens = truncated.total_estimated_tokens(),
            token_budget,
            truncated = truncated.was_truncated(),
            "prompt prepared"
        );

        Ok(PreparedPrompt {
            rendered,
            quality,
            quality_note,
            citations,
            total_tokens: truncated.total_estimated_tokens(),
            token_budget,
            was_truncated: truncated.was_truncated(),
            notices,
            documents,
        })
    }
}

impl PreparedPrompt {
    /// True when the rendered prompt starts with the truncation notice.
    pub fn has_truncation_notice(&self) -> bool {
        self.rendered.starts_with(TRUNCATION_NOTICE)
    }
}

/// Keep the first document per `hash`; documents without a hash are keyed by
/// `url`; documents with neither are always kept. Order is preserved.
pub fn dedupe_by_hash_then_url(documents: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
    let mut seen_hashes = HashSet::new();
    let mut seen_urls = HashSet::new();
    let mut unidentified = 0usize;

    let unique: Vec<ScoredDocument> = documents
        .into_iter()
        .filter(|scored| {
            let document = &scored.document;
            match document.metadata_value(HASH_KEY).filter(|h| !h.trim().is_empty()) {
                Some(hash) => seen_hashes.insert(hash.to_string()),
                None if !document.url().trim().is_empty() => seen_urls.insert(document.url().to_string()),
                None => {
                    unidentified += 1;
                    true
                }
            }
        })
        .collect();

    if unidentified > 0 {
        warn!(unidentified, "kept documents with neither hash nor url metadata");
    }
    unique
}

/// Shorten `text` to about `max_tokens` tokens, preferring a sentence or line
/// break near the limit, and append [`DOCUMENT_TRUNCATION_MARKER`].
pub fn truncate_to_token_limit(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.max(1).saturating_mul(ESTIMATED_CHARS_PER_TOKEN);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text.char_indices().nth(max_chars).map_or(text.len(), |(byte, _)| byte);
    let mut kept = &text[..cut];
    if let Some(break_at) = kept.rfind(['.', '\n']) {
        if kept[..break_at].chars().count() as f64 > max_chars as f64 * BREAK_POINT_THRESHOLD {
            kept = &kept[..=break_at];
        }
    }
    format!("{kept}{DOCUMENT_TRUNCATION_MARKER}")
}

/// Builder for constructing a [`PromptPipeline`].
///
/// `retriever` is required. Configs default, and the reranker defaults to
/// [`ScoreOrderReranker`].
#[derive(Default)]
pub struct PromptPipelineBuilder {
    retrieval: Option<RetrievalConfig>,
    prompt: Option<PromptConfig>,
    retriever: Option<Arc<dyn Retriever>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl PromptPipelineBuilder {
    pub fn retrieval_config(mut self, config: RetrievalConfig) -> Self {
        self.retrieval = Some(config);
        self
    }

    pub fn prompt_config(mut self, config: PromptConfig) -> Self {
        self.prompt = Some(config);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set a reranker for post-search result reordering.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`PromptPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the retriever is missing or the
    /// prompt budget is zero.
    pub fn build(self) -> Result<PromptPipeline> {
        let retriever =
            self.retriever.ok_or_else(|| RagError::ConfigError("retriever is required".to_string()))?;
        let prompt = self.prompt.unwrap_or_default();
        if prompt.token_budget == 0 {
            return Err(RagError::ConfigError("token_budget must be greater than zero".to_string()));
        }
        Ok(PromptPipeline {
            retrieval: self.retrieval.unwrap_or_default(),
            prompt,
            retriever,
            reranker: self.reranker.unwrap_or_else(|| Arc::new(ScoreOrderReranker)),
        })
    }
}
