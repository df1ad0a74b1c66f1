//! Heuristic quality classification of a retrieved result set.
//!
//! The resulting note is injected into the system prompt so the completion
//! model can calibrate its confidence and citation behaviour. Classification
//! never fails; an absent result set is represented by an empty slice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::RetrievedContent;

/// Passages longer than this many characters count as substantial.
pub const SUBSTANTIAL_CONTENT_THRESHOLD: usize = 100;

/// Source URL markers that identify keyword or local fallback search hits.
pub const KEYWORD_SEARCH_MARKERS: [&str; 2] = ["local-search", "keyword"];

/// Quality of a retrieved result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchQualityLevel {
    /// Nothing was retrieved; the model must rely on general knowledge.
    None,
    /// Results came from keyword or fallback search instead of embeddings.
    KeywordSearch,
    /// Every result carries substantial content.
    HighQuality,
    /// Some results are thin.
    MixedQuality,
}

impl SearchQualityLevel {
    /// Classify `contents`.
    ///
    /// Keyword markers take precedence over content length.
    pub fn determine<C: RetrievedContent>(contents: &[C]) -> Self {
        if contents.is_empty() {
            return Self::None;
        }

        let keyword_search = contents.iter().any(|content| {
            let url = content.source_url();
            KEYWORD_SEARCH_MARKERS.iter().any(|marker| url.contains(marker))
        });
        if keyword_search {
            return Self::KeywordSearch;
        }

        if count_high_quality(contents) == contents.len() {
            Self::HighQuality
        } else {
            Self::MixedQuality
        }
    }

    /// Render the note for this level. [`SearchQualityLevel::None`] ignores
    /// both counts.
    pub fn format_message(self, total_count: usize, high_quality_count: usize) -> String {
        match self {
            Self::None => "No relevant documents found. Using general knowledge only.".to_string(),
            Self::KeywordSearch => format!(
                "Found {total_count} documents via keyword search (embedding service unavailable). \
                 Results may be less semantically relevant."
            ),
            Self::HighQuality => {
                format!("Found {total_count} high-quality relevant documents via semantic search.")
            }
            Self::MixedQuality => format!(
                "Found {total_count} documents ({high_quality_count} high-quality) via search. \
                 Some results may be less relevant."
            ),
        }
    }

    /// True when the model should be warned that results may be weak.
    pub fn is_low_confidence(self) -> bool {
        matches!(self, Self::KeywordSearch | Self::MixedQuality)
    }

    /// Classify `contents` and render the matching note in one step.
    pub fn describe<C: RetrievedContent>(contents: &[C]) -> (Self, String) {
        let level = Self::determine(contents);
        let message = level.format_message(contents.len(), count_high_quality(contents));
        (level, message)
    }
}

impl fmt::Display for SearchQualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "NONE",
            Self::KeywordSearch => "KEYWORD_SEARCH",
            Self::HighQuality => "HIGH_QUALITY",
            Self::MixedQuality => "MIXED_QUALITY",
        };
        f.write_str(label)
    }
}

/// Number of passages whose text exceeds [`SUBSTANTIAL_CONTENT_THRESHOLD`].
///
/// Length is measured in UTF-16 code units, so text outside the Basic
/// Multilingual Plane counts two units per character.
pub fn count_high_quality<C: RetrievedContent>(contents: &[C]) -> usize {
    contents
        .iter()
        .filter(|content| content.text().encode_utf16().count() > SUBSTANTIAL_CONTENT_THRESHOLD)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RetrievedResult;

    fn long_text() -> String {
        "a".repeat(SUBSTANTIAL_CONTENT_THRESHOLD + 1)
    }

    #[test]
    fn empty_or_absent_is_none() {
        assert_eq!(SearchQualityLevel::determine::<RetrievedResult>(&[]), SearchQualityLevel::None);
        let absent: Option<Vec<RetrievedResult>> = None;
        assert_eq!(
            SearchQualityLevel::determine(absent.as_deref().unwrap_or_default()),
            SearchQualityLevel::None
        );
    }

    #[test]
    fn keyword_marker_wins_over_length() {
        let results = vec![
            RetrievedResult::new(long_text(), "https://docs.oracle.com/a", 0.9),
            RetrievedResult::new("short", "local-search://parsed/a.txt", 0.1),
        ];
        assert_eq!(SearchQualityLevel::determine(&results), SearchQualityLevel::KeywordSearch);

        let keyword = vec![RetrievedResult::new(long_text(), "https://x/keyword/1", 0.5)];
        assert_eq!(SearchQualityLevel::determine(&keyword), SearchQualityLevel::KeywordSearch);
    }

    #[test]
    fn all_substantial_is_high_quality() {
        let results: Vec<_> = (0..3)
            .map(|i| RetrievedResult::new(long_text(), format!("https://docs/{i}"), 0.8))
            .collect();
        assert_eq!(SearchQualityLevel::determine(&results), SearchQualityLevel::HighQuality);
    }

    #[test]
    fn exactly_threshold_is_not_substantial() {
        let results = vec![
            RetrievedResult::new(long_text(), "https://docs/1", 0.8),
            RetrievedResult::new("a".repeat(SUBSTANTIAL_CONTENT_THRESHOLD), "https://docs/2", 0.7),
        ];
        assert_eq!(SearchQualityLevel::determine(&results), SearchQualityLevel::MixedQuality);
        assert_eq!(count_high_quality(&results), 1);
    }

    #[test]
    fn messages_carry_counts() {
        let high = SearchQualityLevel::HighQuality.format_message(3, 3);
        assert!(high.contains('3'));
        assert!(high.contains("high-quality"));

        let mixed = SearchQualityLevel::MixedQuality.format_message(5, 2);
        assert!(mixed.contains("5 documents"));
        assert!(mixed.contains("2 high-quality"));

        assert!(SearchQualityLevel::KeywordSearch.format_message(4, 0).contains("keyword search"));
    }

    #[test]
    fn none_message_ignores_counts() {
        let baseline = SearchQualityLevel::None.format_message(0, 0);
        assert_eq!(SearchQualityLevel::None.format_message(7, 3), baseline);
        assert_eq!(SearchQualityLevel::None.format_message(usize::MAX, 1), baseline);
    }

    #[test]
    fn describe_combines_level_and_note() {
        let results = vec![
            RetrievedResult::new(long_text(), "https://docs/1", 0.8),
            RetrievedResult::new("tiny", "https://docs/2", 0.3),
        ];
        let (level, note) = SearchQualityLevel::describe(&results);
        assert_eq!(level, SearchQualityLevel::MixedQuality);
        assert!(level.is_low_confidence());
        assert_eq!(note, level.format_message(2, 1));
    }

    #[test]
    fn length_is_counted_in_utf16_units() {
        // 60 supplementary-plane characters are 120 UTF-16 units.
        let emoji = RetrievedResult::new("\u{1F600}".repeat(60), "https://docs/1", 0.5);
        // 101 two-byte characters are still only 101 units.
        let accented = RetrievedResult::new("\u{e9}".repeat(101), "https://docs/2", 0.5);
        let short = RetrievedResult::new("\u{e9}".repeat(100), "https://docs/3", 0.5);
        assert_eq!(count_high_quality(&[emoji, accented, short]), 2);
    }
}
