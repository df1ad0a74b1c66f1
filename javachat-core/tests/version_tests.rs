//! Property tests for Java version detection.

use javachat_core::RetrievalConstraint;
use javachat_core::version::{
    boost_query_with_version_context, extract_filter_patterns, extract_source_identifier,
    extract_version_number,
};
use proptest::prelude::*;

/// Keyword spellings that must sit directly before the digits.
fn arb_keyword() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("Java "),
        Just("java"),
        Just("JDK "),
        Just("jdk-"),
        Just("Java SE "),
        Just("JavaSE "),
    ]
}

/// Words that can never form a version reference.
fn arb_words() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,8}", 0..4).prop_map(|words| words.join(" "))
}

mod prop_extraction {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Property 1: Embedded versions are found**
        ///
        /// A keyword followed by a 1-2 digit version anywhere in a sentence of
        /// digit-free words yields exactly that version.
        #[test]
        fn prop_embedded_version_is_extracted(
            prefix in arb_words(),
            keyword in arb_keyword(),
            version in 1u32..100,
            suffix in arb_words(),
        ) {
            let query = format!("{prefix} {keyword}{version} {suffix}");
            let expected = version.to_string();

            prop_assert_eq!(extract_version_number(&query), Some(expected.clone()));
            prop_assert_eq!(extract_source_identifier(&query), Some(format!("java{expected}")));

            let constraint = RetrievalConstraint::from_version_patterns(
                extract_filter_patterns(&query).as_ref(),
            );
            prop_assert!(constraint.has_server_side_constraint());
        }

        /// **Property 2: No keyword, no version**
        ///
        /// Text without a Java keyword is never treated as versioned, and the
        /// embedding query passes through untouched.
        #[test]
        fn prop_unversioned_queries_pass_through(query in "[a-i0-9 .,?]{0,40}") {
            prop_assert_eq!(extract_version_number(&query), None);
            prop_assert!(extract_filter_patterns(&query).is_none());
            prop_assert_eq!(boost_query_with_version_context(&query), query);
        }

        /// **Property 3: Boosting keeps the user text**
        ///
        /// The boosted query always ends with the original query.
        #[test]
        fn prop_boost_preserves_query(query in ".{0,60}") {
            prop_assert!(boost_query_with_version_context(&query).ends_with(&query));
        }
    }
}
