//! Structured prompt assembly and token-budget truncation.
//!
//! A prompt is a fixed sequence of typed segments: system instructions,
//! retrieved context documents, conversation turns and the current query.
//! Each segment carries a [`PromptSegmentPriority`]; when the total estimate
//! exceeds the budget, whole segments are removed lowest priority first.
//! System instructions and the current query are never removed.
//!
//! # Example
//!
//! ```rust
//! use javachat_core::{
//!     ContextDocumentSegment, CurrentQuerySegment, StructuredPrompt, SystemSegment,
//! };
//!
//! let docs = vec![
//!     ContextDocumentSegment::new(1, "https://docs.oracle.com/a", "Records are ...").unwrap(),
//! ];
//! let prompt = StructuredPrompt::new(
//!     SystemSegment::new("Answer using the context."),
//!     docs,
//!     Vec::new(),
//!     CurrentQuerySegment::new("What is a record?"),
//! );
//! let rendered = prompt.render();
//! assert!(rendered.contains("[CTX 1] https://docs.oracle.com/a"));
//! ```

mod segment;
mod structured;
mod truncate;

pub use segment::{
    ASSISTANT_PREFIX, CONTEXT_MARKER, ContextDocumentSegment, ConversationTurnSegment,
    CurrentQuerySegment, PromptSegment, PromptSegmentPriority, Role, SystemSegment,
};
pub use structured::{SEGMENT_SEPARATOR, StructuredPrompt};
pub use truncate::{TRUNCATION_NOTICE, TruncatedPrompt};
