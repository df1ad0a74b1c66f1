//! Typed prompt segments.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PromptError, Result};
use crate::tokens::estimate_tokens;

/// Marker prefix for context document citations.
pub const CONTEXT_MARKER: &str = "[CTX ";

/// Prefix for assistant turns in the rendered prompt.
pub const ASSISTANT_PREFIX: &str = "Assistant: ";

/// Truncation priority. Variants are ordered from first-removed to never-removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PromptSegmentPriority {
    /// Retrieved context; removed first.
    Low,
    /// Conversation history; removed once no context remains.
    Medium,
    /// The current question; never removed.
    High,
    /// System instructions; never removed.
    Critical,
}

impl PromptSegmentPriority {
    /// Tiers eligible for removal, in removal order.
    pub const TRUNCATION_ORDER: [Self; 2] = [Self::Low, Self::Medium];

    /// True for tiers that truncation may drop.
    pub fn is_truncatable(self) -> bool {
        matches!(self, Self::Low | Self::Medium)
    }

    /// Whether removal within this tier starts from the last segment.
    ///
    /// Context documents arrive most relevant first, so the tail goes first.
    /// Conversation turns arrive oldest first, so the head goes first.
    pub fn evicts_from_tail(self) -> bool {
        matches!(self, Self::Low)
    }
}

/// Participant role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(PromptError::UnknownRole(other.to_string())),
        }
    }
}

/// System instructions. Priority [`PromptSegmentPriority::Critical`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSegment {
    text: String,
    estimated_tokens: usize,
}

impl SystemSegment {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let estimated_tokens = estimate_tokens(&text);
        Self { text, estimated_tokens }
    }

    /// Replace the automatic token estimate.
    pub fn with_estimated_tokens(mut self, tokens: usize) -> Self {
        self.estimated_tokens = tokens;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content(&self) -> &str {
        &self.text
    }

    pub fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    pub fn priority(&self) -> PromptSegmentPriority {
        PromptSegmentPriority::Critical
    }
}

/// A retrieved reference passage. Priority [`PromptSegmentPriority::Low`].
///
/// Renders as `[CTX {index}] {source_url}\n{text}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocumentSegment {
    index: usize,
    source_url: String,
    text: String,
    estimated_tokens: usize,
}

impl ContextDocumentSegment {
    /// Create a context document with a 1-based citation index.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::InvalidContextIndex`] if `index` is zero.
    pub fn new(index: usize, source_url: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        if index < 1 {
            return Err(PromptError::InvalidContextIndex(index));
        }
        let text = text.into();
        let estimated_tokens = estimate_tokens(&text);
        Ok(Self { index, source_url: source_url.into(), text, estimated_tokens })
    }

    /// Replace the automatic token estimate.
    pub fn with_estimated_tokens(mut self, tokens: usize) -> Self {
        self.estimated_tokens = tokens;
        self
    }

    pub(crate) fn renumbered(&self, index: usize) -> Self {
        Self { index, ..self.clone() }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content(&self) -> String {
        format!("{CONTEXT_MARKER}{}] {}\n{}", self.index, self.source_url, self.text)
    }

    pub fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    pub fn priority(&self) -> PromptSegmentPriority {
        PromptSegmentPriority::Low
    }
}

/// A past user or assistant message. Priority [`PromptSegmentPriority::Medium`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurnSegment {
    role: Role,
    text: String,
    estimated_tokens: usize,
}

impl ConversationTurnSegment {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        let text = text.into();
        let estimated_tokens = estimate_tokens(&text);
        Self { role, text, estimated_tokens }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Replace the automatic token estimate.
    pub fn with_estimated_tokens(mut self, tokens: usize) -> Self {
        self.estimated_tokens = tokens;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content(&self) -> Cow<'_, str> {
        match self.role {
            Role::Assistant => Cow::Owned(format!("{ASSISTANT_PREFIX}{}", self.text)),
            Role::User => Cow::Borrowed(&self.text),
        }
    }

    pub fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    pub fn priority(&self) -> PromptSegmentPriority {
        PromptSegmentPriority::Medium
    }
}

/// The question being answered. Priority [`PromptSegmentPriority::High`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuerySegment {
    text: String,
    estimated_tokens: usize,
}

impl CurrentQuerySegment {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let estimated_tokens = estimate_tokens(&text);
        Self { text, estimated_tokens }
    }

    /// Replace the automatic token estimate.
    pub fn with_estimated_tokens(mut self, tokens: usize) -> Self {
        self.estimated_tokens = tokens;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content(&self) -> &str {
        &self.text
    }

    pub fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    pub fn priority(&self) -> PromptSegmentPriority {
        PromptSegmentPriority::High
    }
}

/// Any one segment of a [`StructuredPrompt`](super::StructuredPrompt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSegment {
    System(SystemSegment),
    ContextDocument(ContextDocumentSegment),
    ConversationTurn(ConversationTurnSegment),
    CurrentQuery(CurrentQuerySegment),
}

impl PromptSegment {
    /// Rendered text of the segment.
    pub fn content(&self) -> Cow<'_, str> {
        match self {
            Self::System(s) => Cow::Borrowed(s.content()),
            Self::ContextDocument(d) => Cow::Owned(d.content()),
            Self::ConversationTurn(t) => t.content(),
            Self::CurrentQuery(q) => Cow::Borrowed(q.content()),
        }
    }

    pub fn estimated_tokens(&self) -> usize {
        match self {
            Self::System(s) => s.estimated_tokens(),
            Self::ContextDocument(d) => d.estimated_tokens(),
            Self::ConversationTurn(t) => t.estimated_tokens(),
            Self::CurrentQuery(q) => q.estimated_tokens(),
        }
    }

    pub fn priority(&self) -> PromptSegmentPriority {
        match self {
            Self::System(s) => s.priority(),
            Self::ContextDocument(d) => d.priority(),
            Self::ConversationTurn(t) => t.priority(),
            Self::CurrentQuery(q) => q.priority(),
        }
    }
}

impl From<SystemSegment> for PromptSegment {
    fn from(segment: SystemSegment) -> Self {
        Self::System(segment)
    }
}

impl From<ContextDocumentSegment> for PromptSegment {
    fn from(segment: ContextDocumentSegment) -> Self {
        Self::ContextDocument(segment)
    }
}

impl From<ConversationTurnSegment> for PromptSegment {
    fn from(segment: ConversationTurnSegment) -> Self {
        Self::ConversationTurn(segment)
    }
}

impl From<CurrentQuerySegment> for PromptSegment {
    fn from(segment: CurrentQuerySegment) -> Self {
        Self::CurrentQuery(segment)
    }
}
