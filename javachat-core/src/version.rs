//! Java version detection for version-aware retrieval.
//!
//! Recognises references such as `Java 25`, `JDK 24`, `java25`, `jdk-21`,
//! `Java SE 17` and `JavaSE 11`. The trigger keyword must sit directly before
//! the digits, so unrelated numbers like `3.14` never match. All functions are
//! total: blank or unmatched input simply yields `None` or the input itself.

use std::sync::LazyLock;

use regex::Regex;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:java\s*se|javase|java|jdk)[\s-]*(\d{1,2})\b")
        .expect("unreachable error: failed to compile version pattern")
});

/// Return the first 1-2 digit Java version referenced in `query`.
pub fn extract_version_number(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        return None;
    }
    VERSION_PATTERN
        .captures(query)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Return a source identifier such as `java25` usable as a collection or
/// path filter.
pub fn extract_source_identifier(query: &str) -> Option<String> {
    extract_version_number(query).map(|version| format!("java{version}"))
}

/// Build URL and title matchers for the version referenced in `query`.
pub fn extract_filter_patterns(query: &str) -> Option<VersionFilterPatterns> {
    extract_version_number(query).map(VersionFilterPatterns::new)
}

/// Prefix `query` with version context to strengthen the embedding query.
///
/// The boosted text is only ever embedded; it is never rendered into the
/// prompt. Queries without a detectable version are returned unchanged.
pub fn boost_query_with_version_context(query: &str) -> String {
    match extract_version_number(query) {
        Some(v) => {
            format!("JDK {v} Java SE {v} Java {v} release features documentation: {query}")
        }
        None => query.to_string(),
    }
}

/// URL and title tokens derived from a detected version number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFilterPatterns {
    version_number: String,
    url_tokens: Vec<String>,
    text_tokens: Vec<String>,
}

impl VersionFilterPatterns {
    /// Build the token sets for `version_number`.
    pub fn new(version_number: impl Into<String>) -> Self {
        let v = version_number.into();
        let url_tokens = vec![
            format!("java{v}"),
            format!("jdk{v}"),
            format!("java-{v}"),
            format!("jdk-{v}"),
            format!("/javase/{v}"),
            format!("/java/javase/{v}"),
            format!("/java/se/{v}"),
        ];
        let text_tokens = vec![format!("java se {v}"), format!("jdk {v}")];
        Self { version_number: v, url_tokens, text_tokens }
    }

    pub fn version_number(&self) -> &str {
        &self.version_number
    }

    pub fn url_tokens(&self) -> &[String] {
        &self.url_tokens
    }

    pub fn text_tokens(&self) -> &[String] {
        &self.text_tokens
    }

    /// True when `url` contains any version-specific URL token.
    pub fn matches_url(&self, url: &str) -> bool {
        contains_any(url, &self.url_tokens)
    }

    /// True when the URL or the title carries a version-specific token.
    pub fn matches_metadata(&self, url: &str, title: &str) -> bool {
        self.matches_url(url) || contains_any(title, &self.text_tokens)
    }
}

fn contains_any(haystack: &str, tokens: &[String]) -> bool {
    if haystack.is_empty() || tokens.is_empty() {
        return false;
    }
    let lower = haystack.to_lowercase();
    tokens.iter().any(|token| lower.contains(token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_common_spellings() {
        assert_eq!(extract_version_number("What's new in Java 25").as_deref(), Some("25"));
        assert_eq!(extract_version_number("JDK 24 features").as_deref(), Some("24"));
        assert_eq!(extract_version_number("java25 records").as_deref(), Some("25"));
        assert_eq!(extract_version_number("jdk-21 virtual threads").as_deref(), Some("21"));
        assert_eq!(extract_version_number("Java SE 17 sealed").as_deref(), Some("17"));
        assert_eq!(extract_version_number("JavaSE 11").as_deref(), Some("11"));
        assert_eq!(extract_version_number("JAVA 8 streams").as_deref(), Some("8"));
    }

    #[test]
    fn returns_first_match() {
        assert_eq!(extract_version_number("java 17 vs java 21").as_deref(), Some("17"));
    }

    #[test]
    fn ignores_unrelated_numbers() {
        assert_eq!(extract_version_number("what is 3.14 in a double"), None);
        assert_eq!(extract_version_number("javascript 2015"), None);
        assert_eq!(extract_version_number("java 250"), None);
        assert_eq!(extract_version_number("   "), None);
        assert_eq!(extract_version_number(""), None);
    }

    #[test]
    fn source_identifier_uses_java_prefix() {
        assert_eq!(extract_source_identifier("What's new in Java 25").as_deref(), Some("java25"));
        assert_eq!(extract_source_identifier("How do streams work?"), None);
    }

    #[test]
    fn boost_prefixes_only_when_version_present() {
        assert_eq!(
            boost_query_with_version_context("Java 21 records"),
            "JDK 21 Java SE 21 Java 21 release features documentation: Java 21 records"
        );
        assert_eq!(boost_query_with_version_context("records"), "records");
    }

    #[test]
    fn filter_patterns_match_urls_and_titles() {
        let patterns = extract_filter_patterns("jdk 21").expect("version present");
        assert_eq!(patterns.version_number(), "21");
        assert!(patterns.matches_url("https://docs.oracle.com/en/java/javase/21/docs/api/"));
        assert!(patterns.matches_url("https://openjdk.org/projects/JDK-21/"));
        assert!(!patterns.matches_url("https://docs.oracle.com/en/java/javase/17/"));
        assert!(patterns.matches_metadata("", "Java SE 21 Release Notes"));
        assert!(!patterns.matches_metadata("", "Java SE 17 Release Notes"));
        assert!(!patterns.matches_metadata("", ""));
    }
}
