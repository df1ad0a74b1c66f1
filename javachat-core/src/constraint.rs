//! Metadata constraints pushed down into vector-index queries.

use serde::{Deserialize, Serialize};

use crate::version::VersionFilterPatterns;

/// Payload field holding the documentation version token.
pub const DOC_VERSION_FIELD: &str = "docVersion";
/// Payload field holding the source kind token (e.g. `official`).
pub const SOURCE_KIND_FIELD: &str = "sourceKind";
/// Payload field holding the document type token (e.g. `api-docs`).
pub const DOC_TYPE_FIELD: &str = "docType";
/// Payload field holding the source name token (e.g. `oracle`).
pub const SOURCE_NAME_FIELD: &str = "sourceName";

/// Optional metadata constraints for a single retrieval request.
///
/// Every field is trimmed at construction; an empty field is unconstrained.
/// Values are immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetrievalConstraint {
    doc_version: String,
    source_kind: String,
    doc_type: String,
    source_name: String,
}

impl RetrievalConstraint {
    /// Build a constraint from arbitrary (possibly blank) field values.
    pub fn new(doc_version: &str, source_kind: &str, doc_type: &str, source_name: &str) -> Self {
        Self {
            doc_version: sanitize(doc_version),
            source_kind: sanitize(source_kind),
            doc_type: sanitize(doc_type),
            source_name: sanitize(source_name),
        }
    }

    /// An unconstrained retrieval.
    pub fn none() -> Self {
        Self::default()
    }

    /// Constrain retrieval to a single documentation version.
    pub fn for_doc_version(doc_version: &str) -> Self {
        Self::new(doc_version, "", "", "")
    }

    /// Constraint derived from the version detected in a query, if any.
    pub fn from_version_patterns(patterns: Option<&VersionFilterPatterns>) -> Self {
        patterns.map(|p| Self::for_doc_version(p.version_number())).unwrap_or_default()
    }

    pub fn doc_version(&self) -> &str {
        &self.doc_version
    }

    pub fn source_kind(&self) -> &str {
        &self.source_kind
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// True when at least one field can be applied as an index-side filter.
    pub fn has_server_side_constraint(&self) -> bool {
        !self.doc_version.is_empty()
            || !self.source_kind.is_empty()
            || !self.doc_type.is_empty()
            || !self.source_name.is_empty()
    }

    /// Non-empty `(payload field, value)` pairs in a fixed order.
    ///
    /// Every pair must match exactly for a point to pass the filter.
    pub fn must_match(&self) -> Vec<(&'static str, &str)> {
        [
            (DOC_VERSION_FIELD, self.doc_version.as_str()),
            (SOURCE_KIND_FIELD, self.source_kind.as_str()),
            (DOC_TYPE_FIELD, self.doc_type.as_str()),
            (SOURCE_NAME_FIELD, self.source_name.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

fn sanitize(raw: &str) -> String {
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_unconstrained() {
        let constraint = RetrievalConstraint::none();
        assert!(!constraint.has_server_side_constraint());
        assert!(constraint.must_match().is_empty());
    }

    #[test]
    fn doc_version_is_server_side() {
        let constraint = RetrievalConstraint::for_doc_version("25");
        assert!(constraint.has_server_side_constraint());
        assert_eq!(constraint.must_match(), vec![(DOC_VERSION_FIELD, "25")]);
    }

    #[test]
    fn fields_are_trimmed_and_blank_means_empty() {
        let constraint = RetrievalConstraint::new("  21 ", "   ", "\tapi-docs\n", "");
        assert_eq!(constraint.doc_version(), "21");
        assert_eq!(constraint.source_kind(), "");
        assert_eq!(constraint.doc_type(), "api-docs");
        assert_eq!(
            constraint.must_match(),
            vec![(DOC_VERSION_FIELD, "21"), (DOC_TYPE_FIELD, "api-docs")]
        );
    }

    #[test]
    fn blank_fields_only_is_unconstrained() {
        assert!(!RetrievalConstraint::new(" ", "", "\t", "\n").has_server_side_constraint());
    }

    #[test]
    fn from_version_patterns() {
        let patterns = VersionFilterPatterns::new("17");
        assert_eq!(
            RetrievalConstraint::from_version_patterns(Some(&patterns)),
            RetrievalConstraint::for_doc_version("17")
        );
        assert_eq!(RetrievalConstraint::from_version_patterns(None), RetrievalConstraint::none());
    }
}
