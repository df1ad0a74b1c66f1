//! Error types for the `javachat-core` crate.

use thiserror::Error;

/// Errors raised while constructing prompt segments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Context documents are numbered from 1 for `[CTX n]` citation markers.
    #[error("context document index must be at least 1, got {0}")]
    InvalidContextIndex(usize),

    /// A conversation role string that is neither `user` nor `assistant`.
    #[error("unknown conversation role '{0}'")]
    UnknownRole(String),
}

/// A convenience result type for prompt operations.
pub type Result<T> = std::result::Result<T, PromptError>;
