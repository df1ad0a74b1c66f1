//! Configuration for retrieval and prompt assembly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collection::CollectionKind;
use crate::error::{RagError, Result};

/// Retry policy applied to every index and embedding call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetrySettings {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Index collection name per content kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionNames {
    pub books: String,
    pub docs: String,
    pub articles: String,
    pub pdfs: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            books: "java-chat-books".to_string(),
            docs: "java-docs".to_string(),
            articles: "java-articles".to_string(),
            pdfs: "java-pdfs".to_string(),
        }
    }
}

impl CollectionNames {
    /// Configured name for `kind`.
    pub fn name_for(&self, kind: CollectionKind) -> &str {
        match kind {
            CollectionKind::Books => &self.books,
            CollectionKind::Docs => &self.docs,
            CollectionKind::Articles => &self.articles,
            CollectionKind::Pdfs => &self.pdfs,
        }
    }

    /// Every configured name, in [`CollectionKind::ALL`] order.
    pub fn all(&self) -> Vec<&str> {
        CollectionKind::ALL.iter().map(|kind| self.name_for(*kind)).collect()
    }
}

/// Configuration parameters for hybrid retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Number of candidates fetched per search.
    pub top_k: usize,
    /// Number of documents kept after reranking.
    pub return_k: usize,
    /// Minimum score for a hit to be returned.
    pub score_threshold: f32,
    /// Named dense vector slot.
    pub dense_vector_name: String,
    /// Named sparse vector slot.
    pub sparse_vector_name: String,
    /// Candidates fetched by each prefetch stage before fusion.
    pub prefetch_limit: usize,
    /// Deadline for one search attempt.
    pub search_timeout: Duration,
    /// Deadline for one upsert attempt.
    pub upsert_timeout: Duration,
    /// Deadline for one delete attempt.
    pub delete_timeout: Duration,
    /// Fail the whole search when any collection fails.
    pub fail_on_partial_search_error: bool,
    pub collections: CollectionNames,
    pub retry: RetrySettings,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            return_k: 5,
            score_threshold: 0.0,
            dense_vector_name: "dense".to_string(),
            sparse_vector_name: "bm25".to_string(),
            prefetch_limit: 20,
            search_timeout: Duration::from_secs(5),
            upsert_timeout: Duration::from_secs(30),
            delete_timeout: Duration::from_secs(15),
            fail_on_partial_search_error: true,
            collections: CollectionNames::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl RetrievalConfig {
    /// Create a new builder for constructing a [`RetrievalConfig`].
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn return_k(mut self, k: usize) -> Self {
        self.config.return_k = k;
        self
    }

    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.config.score_threshold = threshold;
        self
    }

    pub fn dense_vector_name(mut self, name: impl Into<String>) -> Self {
        self.config.dense_vector_name = name.into();
        self
    }

    pub fn sparse_vector_name(mut self, name: impl Into<String>) -> Self {
        self.config.sparse_vector_name = name.into();
        self
    }

    pub fn prefetch_limit(mut self, limit: usize) -> Self {
        self.config.prefetch_limit = limit;
        self
    }

    pub fn search_timeout(mut self, timeout: Duration) -> Self {
        self.config.search_timeout = timeout;
        self
    }

    pub fn upsert_timeout(mut self, timeout: Duration) -> Self {
        self.config.upsert_timeout = timeout;
        self
    }

    pub fn delete_timeout(mut self, timeout: Duration) -> Self {
        self.config.delete_timeout = timeout;
        self
    }

    pub fn fail_on_partial_search_error(mut self, fail: bool) -> Self {
        self.config.fail_on_partial_search_error = fail;
        self
    }

    pub fn collections(mut self, collections: CollectionNames) -> Self {
        self.config.collections = collections;
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the [`RetrievalConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k`, `return_k` or `prefetch_limit` is zero
    /// - a vector or collection name is blank
    /// - a timeout is zero
    /// - `retry.max_attempts` is zero or `retry.multiplier` is below 1
    pub fn build(self) -> Result<RetrievalConfig> {
        let config = self.config;
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.return_k == 0 {
            return Err(RagError::ConfigError("return_k must be greater than zero".to_string()));
        }
        if config.prefetch_limit == 0 {
            return Err(RagError::ConfigError(
                "prefetch_limit must be greater than zero".to_string(),
            ));
        }
        if config.dense_vector_name.trim().is_empty() || config.sparse_vector_name.trim().is_empty()
        {
            return Err(RagError::ConfigError("vector names must not be blank".to_string()));
        }
        if config.dense_vector_name == config.sparse_vector_name {
            return Err(RagError::ConfigError(format!(
                "dense and sparse vector names must differ (both '{}')",
                config.dense_vector_name
            )));
        }
        for (label, timeout) in [
            ("search_timeout", config.search_timeout),
            ("upsert_timeout", config.upsert_timeout),
            ("delete_timeout", config.delete_timeout),
        ] {
            if timeout.is_zero() {
                return Err(RagError::ConfigError(format!("{label} must be greater than zero")));
            }
        }
        if config.collections.all().iter().any(|name| name.trim().is_empty()) {
            return Err(RagError::ConfigError("collection names must not be blank".to_string()));
        }
        if config.retry.max_attempts == 0 {
            return Err(RagError::ConfigError(
                "retry.max_attempts must be at least one".to_string(),
            ));
        }
        if config.retry.multiplier.is_nan() || config.retry.multiplier < 1.0 {
            return Err(RagError::ConfigError(format!(
                "retry.multiplier ({}) must be at least 1.0",
                config.retry.multiplier
            )));
        }
        Ok(config)
    }
}

const JDK_VERSION_PLACEHOLDER: &str = "{jdk_version}";

const DEFAULT_CORE_TEMPLATE: &str = "\
You are a Java learning assistant focused on Java {jdk_version} and current stable JDK releases.

Ground every answer in the numbered [CTX n] passages when they are relevant. If the passages \
are missing, incomplete or conflicting, say so and ask for the missing detail (version, build \
tool, link) instead of guessing. Label anything drawn from general knowledge as such.

Prefer official documentation and stable releases over previews or early-access content, and \
be explicit about version-specific behaviour.";

const DEFAULT_LOW_QUALITY_GUIDANCE: &str = "\
Note: Search results may be less relevant than usual.
Ask a clarifying question or request a source/version before relying on general knowledge.";

/// System instruction text and the guidance appended for weak retrievals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemPromptTemplate {
    /// Core instructions; `{jdk_version}` is substituted.
    pub core: String,
    /// Appended when the result set is keyword-based or mixed.
    pub low_quality_guidance: String,
    /// Value substituted for `{jdk_version}`.
    pub jdk_version: String,
}

impl Default for SystemPromptTemplate {
    fn default() -> Self {
        Self {
            core: DEFAULT_CORE_TEMPLATE.to_string(),
            low_quality_guidance: DEFAULT_LOW_QUALITY_GUIDANCE.to_string(),
            jdk_version: "25".to_string(),
        }
    }
}

impl SystemPromptTemplate {
    /// Use `core` as the instruction text with the default guidance.
    pub fn new(core: impl Into<String>) -> Self {
        Self { core: core.into(), ..Self::default() }
    }

    pub fn with_jdk_version(mut self, version: impl Into<String>) -> Self {
        self.jdk_version = version.into();
        self
    }

    pub fn core_prompt(&self) -> String {
        self.core.replace(JDK_VERSION_PLACEHOLDER, &self.jdk_version)
    }

    /// System text for a retrieval with the given quality note.
    pub fn render(&self, quality_note: &str, low_confidence: bool) -> String {
        let mut text = self.core_prompt();
        if !quality_note.is_empty() {
            text.push_str("\n\nSEARCH CONTEXT: ");
            text.push_str(quality_note);
            if low_confidence && !self.low_quality_guidance.is_empty() {
                text.push('\n');
                text.push_str(&self.low_quality_guidance);
            }
        }
        text
    }
}

/// Prompt assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    pub system: SystemPromptTemplate,
    /// Default token budget when a request does not carry one.
    pub token_budget: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { system: SystemPromptTemplate::default(), token_budget: 8192 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = RetrievalConfig::builder().build().unwrap();
        assert_eq!(config, RetrievalConfig::default());
        assert_eq!(config.upsert_timeout, Duration::from_secs(30));
        assert_eq!(config.delete_timeout, Duration::from_secs(15));
        assert_eq!(config.collections.all(), vec!["java-chat-books", "java-docs", "java-articles", "java-pdfs"]);
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(RetrievalConfig::builder().top_k(0).build().is_err());
        assert!(RetrievalConfig::builder().return_k(0).build().is_err());
        assert!(RetrievalConfig::builder().prefetch_limit(0).build().is_err());
        assert!(RetrievalConfig::builder().delete_timeout(Duration::ZERO).build().is_err());
    }

    #[test]
    fn vector_names_must_be_distinct_and_present() {
        assert!(RetrievalConfig::builder().dense_vector_name(" ").build().is_err());
        assert!(RetrievalConfig::builder().sparse_vector_name("dense").build().is_err());
    }

    #[test]
    fn retry_settings_are_validated() {
        let no_attempts = RetrySettings { max_attempts: 0, ..RetrySettings::default() };
        assert!(RetrievalConfig::builder().retry(no_attempts).build().is_err());
        let shrinking = RetrySettings { multiplier: 0.5, ..RetrySettings::default() };
        assert!(RetrievalConfig::builder().retry(shrinking).build().is_err());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetrySettings::default();
        assert_eq!(retry.backoff_for(1), Duration::from_millis(500));
        assert_eq!(retry.backoff_for(2), Duration::from_secs(1));
        assert_eq!(retry.backoff_for(3), Duration::from_secs(2));
        assert_eq!(retry.backoff_for(40), Duration::from_secs(30));
    }

    #[test]
    fn system_prompt_appends_search_context() {
        let template = SystemPromptTemplate::new("Core {jdk_version}.").with_jdk_version("21");
        assert_eq!(template.render("", false), "Core 21.");
        assert_eq!(template.render("Found 3 docs.", false), "Core 21.\n\nSEARCH CONTEXT: Found 3 docs.");
        let weak = template.render("Some results may be less relevant.", true);
        assert!(weak.ends_with(&template.low_quality_guidance));
    }
}
