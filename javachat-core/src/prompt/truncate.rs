use tracing::{debug, info, warn};

use super::segment::{PromptSegment, PromptSegmentPriority};
use super::structured::{SEGMENT_SEPARATOR, StructuredPrompt};

/// Notice prepended to a rendered prompt whose context was cut.
pub const TRUNCATION_NOTICE: &str = "[Context truncated due to model input limit]";

/// Outcome of fitting a [`StructuredPrompt`] into a token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedPrompt {
    prompt: StructuredPrompt,
    token_budget: usize,
    removed_documents: usize,
    removed_turns: usize,
}

impl TruncatedPrompt {
    /// The surviving prompt.
    pub fn prompt(&self) -> &StructuredPrompt {
        &self.prompt
    }

    pub fn into_prompt(self) -> StructuredPrompt {
        self.prompt
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    pub fn removed_documents(&self) -> usize {
        self.removed_documents
    }

    pub fn removed_turns(&self) -> usize {
        self.removed_turns
    }

    pub fn was_truncated(&self) -> bool {
        self.removed_documents > 0 || self.removed_turns > 0
    }

    pub fn total_estimated_tokens(&self) -> usize {
        self.prompt.total_estimated_tokens()
    }

    /// Tokens above the budget that could not be removed.
    pub fn overage(&self) -> usize {
        self.total_estimated_tokens().saturating_sub(self.token_budget)
    }

    /// Render the surviving prompt, prefixed with [`TRUNCATION_NOTICE`] when
    /// anything was removed.
    pub fn render(&self) -> String {
        let body = self.prompt.render();
        if self.was_truncated() {
            format!("{TRUNCATION_NOTICE}{SEGMENT_SEPARATOR}{body}")
        } else {
            body
        }
    }
}

pub(super) fn truncate(prompt: &StructuredPrompt, token_budget: usize) -> TruncatedPrompt {
    let total = prompt.total_estimated_tokens();
    if total <= token_budget {
        return TruncatedPrompt {
            prompt: prompt.clone(),
            token_budget,
            removed_documents: 0,
            removed_turns: 0,
        };
    }

    let segments = prompt.segments();
    let mut removed = vec![false; segments.len()];
    let mut remaining = total;

    for position in removal_queue(&segments) {
        if remaining <= token_budget {
            break;
        }
        remaining -= segments[position].estimated_tokens();
        removed[position] = true;
    }

    let mut context_documents = Vec::new();
    let mut conversation_history = Vec::new();
    let mut removed_documents = 0;
    let mut removed_turns = 0;

    for (segment, dropped) in segments.iter().zip(removed) {
        match segment {
            PromptSegment::System(_) | PromptSegment::CurrentQuery(_) => {}
            PromptSegment::ContextDocument(doc) if dropped => {
                debug!(index = doc.index(), url = doc.source_url(), "dropping context document");
                removed_documents += 1;
            }
            PromptSegment::ContextDocument(doc) => {
                context_documents.push(doc.renumbered(context_documents.len() + 1));
            }
            PromptSegment::ConversationTurn(_) if dropped => removed_turns += 1,
            PromptSegment::ConversationTurn(turn) => conversation_history.push(turn.clone()),
        }
    }

    let truncated = TruncatedPrompt {
        prompt: prompt
            .with_context_documents(context_documents)
            .with_conversation_history(conversation_history),
        token_budget,
        removed_documents,
        removed_turns,
    };

    if truncated.overage() > 0 {
        warn!(
            token_budget,
            reserved = prompt.reserved_tokens(),
            "system prompt and query exceed token budget"
        );
    }
    info!(
        token_budget,
        original_tokens = total,
        final_tokens = truncated.total_estimated_tokens(),
        removed_documents,
        removed_turns,
        "prompt truncated"
    );

    truncated
}

/// Positions of removable segments in removal order.
fn removal_queue(segments: &[PromptSegment]) -> Vec<usize> {
    let mut queue = Vec::new();
    for tier in PromptSegmentPriority::TRUNCATION_ORDER {
        let mut positions: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.priority() == tier)
            .map(|(position, _)| position)
            .collect();
        if tier.evicts_from_tail() {
            positions.reverse();
        }
        queue.extend(positions);
    }
    queue
}
