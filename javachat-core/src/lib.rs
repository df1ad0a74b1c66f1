//! # javachat-core
//!
//! Synchronous building blocks for grounding a completion model in Java
//! reference documentation.
//!
//! ## Overview
//!
//! - [`version`] - detects explicit Java/JDK versions in a query and derives
//!   filter and embedding-boost hints
//! - [`RetrievalConstraint`] - metadata filter pushed into the vector index
//! - [`SearchQualityLevel`] - classifies a retrieved result set and renders a
//!   note the model can use to calibrate confidence
//! - [`StructuredPrompt`] - priority-tagged prompt segments with whole-segment
//!   truncation to a token budget
//!
//! ## Quick Start
//!
//! ```rust
//! use javachat_core::{
//!     CurrentQuerySegment, RetrievalConstraint, StructuredPrompt, SystemSegment, version,
//! };
//!
//! let query = "What's new in Java 25?";
//! let constraint = version::extract_version_number(query)
//!     .map(|v| RetrievalConstraint::for_doc_version(&v))
//!     .unwrap_or_else(RetrievalConstraint::none);
//! assert!(constraint.has_server_side_constraint());
//!
//! let prompt = StructuredPrompt::new(
//!     SystemSegment::new("You are a Java tutor."),
//!     Vec::new(),
//!     Vec::new(),
//!     CurrentQuerySegment::new(query),
//! );
//! let truncated = prompt.truncate(4096);
//! assert!(!truncated.was_truncated());
//! ```

pub mod constraint;
pub mod document;
pub mod error;
pub mod prompt;
pub mod quality;
pub mod tokens;
pub mod version;

pub use constraint::RetrievalConstraint;
pub use document::{RetrievedContent, RetrievedResult};
pub use error::{PromptError, Result};
pub use prompt::{
    ContextDocumentSegment, ConversationTurnSegment, CurrentQuerySegment, PromptSegment,
    PromptSegmentPriority, Role, StructuredPrompt, SystemSegment, TruncatedPrompt,
};
pub use quality::SearchQualityLevel;
pub use tokens::estimate_tokens;
pub use version::VersionFilterPatterns;
