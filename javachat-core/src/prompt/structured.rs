use super::segment::{
    ContextDocumentSegment, ConversationTurnSegment, CurrentQuerySegment, PromptSegment,
    SystemSegment,
};
use super::truncate::{self, TruncatedPrompt};

/// Separator placed between rendered segments.
pub const SEGMENT_SEPARATOR: &str = "\n\n";

/// A prompt assembled from typed segments.
///
/// Exactly one system segment and one current query are present by
/// construction. Rendering order is system, context documents, conversation
/// history, current query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredPrompt {
    system: SystemSegment,
    context_documents: Vec<ContextDocumentSegment>,
    conversation_history: Vec<ConversationTurnSegment>,
    current_query: CurrentQuerySegment,
}

impl StructuredPrompt {
    /// Context documents are expected most relevant first and conversation
    /// turns oldest first.
    pub fn new(
        system: SystemSegment,
        context_documents: Vec<ContextDocumentSegment>,
        conversation_history: Vec<ConversationTurnSegment>,
        current_query: CurrentQuerySegment,
    ) -> Self {
        Self { system, context_documents, conversation_history, current_query }
    }

    /// Wrap a legacy flat prompt as a single system segment.
    ///
    /// The result has no context, no history and an empty current query, so
    /// truncation can never shrink it.
    pub fn from_raw_prompt(raw_prompt: impl Into<String>, estimated_tokens: usize) -> Self {
        Self::new(
            SystemSegment::new(raw_prompt).with_estimated_tokens(estimated_tokens),
            Vec::new(),
            Vec::new(),
            CurrentQuerySegment::new("").with_estimated_tokens(0),
        )
    }

    pub fn system(&self) -> &SystemSegment {
        &self.system
    }

    pub fn context_documents(&self) -> &[ContextDocumentSegment] {
        &self.context_documents
    }

    pub fn conversation_history(&self) -> &[ConversationTurnSegment] {
        &self.conversation_history
    }

    pub fn current_query(&self) -> &CurrentQuerySegment {
        &self.current_query
    }

    /// Copy of this prompt with its context documents replaced.
    pub fn with_context_documents(&self, context_documents: Vec<ContextDocumentSegment>) -> Self {
        Self { context_documents, ..self.clone() }
    }

    /// Copy of this prompt with its conversation history replaced.
    pub fn with_conversation_history(
        &self,
        conversation_history: Vec<ConversationTurnSegment>,
    ) -> Self {
        Self { conversation_history, ..self.clone() }
    }

    /// All segments in rendering order.
    pub fn segments(&self) -> Vec<PromptSegment> {
        let mut segments =
            Vec::with_capacity(self.context_documents.len() + self.conversation_history.len() + 2);
        segments.push(PromptSegment::System(self.system.clone()));
        segments.extend(self.context_documents.iter().cloned().map(PromptSegment::ContextDocument));
        segments
            .extend(self.conversation_history.iter().cloned().map(PromptSegment::ConversationTurn));
        segments.push(PromptSegment::CurrentQuery(self.current_query.clone()));
        segments
    }

    /// Sum of every segment's estimate.
    pub fn total_estimated_tokens(&self) -> usize {
        self.system.estimated_tokens()
            + self.context_documents.iter().map(ContextDocumentSegment::estimated_tokens).sum::<usize>()
            + self
                .conversation_history
                .iter()
                .map(ConversationTurnSegment::estimated_tokens)
                .sum::<usize>()
            + self.current_query.estimated_tokens()
    }

    /// Estimate of the segments truncation never removes.
    pub fn reserved_tokens(&self) -> usize {
        self.system.estimated_tokens() + self.current_query.estimated_tokens()
    }

    /// Source URLs of the context documents, in citation order.
    pub fn citations(&self) -> Vec<&str> {
        self.context_documents.iter().map(ContextDocumentSegment::source_url).collect()
    }

    /// Join every non-empty segment with [`SEGMENT_SEPARATOR`].
    pub fn render(&self) -> String {
        self.segments()
            .iter()
            .map(PromptSegment::content)
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR)
    }

    /// Fit the prompt into `token_budget` by removing whole segments.
    ///
    /// Context documents go first, least relevant (last) first; then
    /// conversation turns, oldest first. Survivors keep their relative order
    /// and context documents are renumbered `1..=n`. When the system segment
    /// and current query alone exceed the budget, everything else is dropped
    /// and the overage is reported on the result.
    pub fn truncate(&self, token_budget: usize) -> TruncatedPrompt {
        truncate::truncate(self, token_budget)
    }
}
