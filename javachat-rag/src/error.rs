//! Error types for the `javachat-rag` crate.

use std::time::Duration;

use javachat_core::PromptError;
use thiserror::Error;

/// Lower-cased message fragments that mark a backend failure as transient.
const TRANSIENT_MARKERS: [&str; 9] = [
    "connection",
    "connect error",
    "timed out",
    "timeout",
    "unavailable",
    "deadline exceeded",
    "resource exhausted",
    "too many requests",
    "429",
];

/// Errors that can occur in retrieval and prompt assembly.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index rejected an operation.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend could not be reached or asked the caller to back off.
    #[error("Transport error ({backend}): {message}")]
    Transport {
        /// The backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A single attempt ran past its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Label of the operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The caller cancelled the operation.
    #[error("{operation} was cancelled")]
    Cancelled {
        /// Label of the cancelled operation.
        operation: String,
    },

    /// Caller-supplied arguments were inconsistent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Prompt construction failed.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl RagError {
    /// Whether retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::EmbeddingError { message, .. } => is_transient_message(message),
            Self::VectorStoreError { .. }
            | Self::Cancelled { .. }
            | Self::InvalidArgument(_)
            | Self::ConfigError(_)
            | Self::PipelineError(_)
            | Self::Prompt(_) => false,
        }
    }

    /// Map a raw backend failure to [`RagError::Transport`] or
    /// [`RagError::VectorStoreError`] depending on its message.
    pub fn from_backend(backend: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_transient_message(&message) {
            Self::Transport { backend: backend.to_string(), message }
        } else {
            Self::VectorStoreError { backend: backend.to_string(), message }
        }
    }
}

fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_messages_are_classified() {
        assert!(RagError::from_backend("qdrant", "status: Unavailable, connection refused").is_transient());
        assert!(RagError::from_backend("qdrant", "Deadline Exceeded").is_transient());
        assert!(RagError::from_backend("qdrant", "HTTP 429").is_transient());
        assert!(!RagError::from_backend("qdrant", "Wrong input: collection not found").is_transient());
    }

    #[test]
    fn argument_and_cancellation_are_final() {
        assert!(!RagError::InvalidArgument("x".into()).is_transient());
        assert!(!RagError::Cancelled { operation: "search".into() }.is_transient());
        assert!(
            RagError::Timeout { operation: "upsert".into(), timeout: Duration::from_secs(30) }
                .is_transient()
        );
    }

    #[test]
    fn embedding_errors_follow_message() {
        let unavailable = RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "API returned 503 Service Unavailable".into(),
        };
        assert!(unavailable.is_transient());
        let bad_key =
            RagError::EmbeddingError { provider: "OpenAI".into(), message: "invalid api key".into() };
        assert!(!bad_key.is_transient());
    }
}
