//! End-to-end tests for prompt preparation over the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use javachat_core::prompt::TRUNCATION_NOTICE;
use javachat_core::{Role, SearchQualityLevel};
use javachat_rag::pipeline::{DOCUMENT_TRUNCATION_MARKER, truncate_to_token_limit};
use javachat_rag::{
    CancellationToken, Document, HashingEmbeddingProvider, HistoryTurn, InMemoryVectorStore,
    PromptConfig, PromptPipeline, PromptRequest, RagError, Reranker, Result, RetrievalConfig,
    Retriever, ScoredDocument, SystemPromptTemplate,
};
use javachat_telemetry::EventCapture;
use tracing::Level;

fn passage(topic: &str) -> String {
    format!(
        "Java {topic} documentation. This passage explains {topic} in detail, with examples of \
         how {topic} interacts with the rest of the platform and the standard library."
    )
}

fn doc(url: &str, version: &str, text: impl Into<String>) -> Document {
    Document::new(text).with_metadata("url", url).with_metadata("docVersion", version)
}

async fn store_with(documents: &[Document]) -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::default())));
    store.upsert("java-docs", documents, &CancellationToken::new()).await.unwrap();
    store
}

fn retrieval_config(return_k: usize) -> RetrievalConfig {
    RetrievalConfig::builder().score_threshold(-1.0).return_k(return_k).build().unwrap()
}

fn pipeline(store: Arc<InMemoryVectorStore>, return_k: usize) -> PromptPipeline {
    PromptPipeline::builder()
        .retrieval_config(retrieval_config(return_k))
        .prompt_config(PromptConfig {
            system: SystemPromptTemplate::new("You are a Java tutor."),
            token_budget: 8192,
        })
        .retriever(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn blank_query_uses_general_knowledge() {
    let store = store_with(&[doc("https://docs/records", "25", passage("records"))]).await;
    let prepared = pipeline(store, 5)
        .prepare(&PromptRequest::new("   "), &CancellationToken::new())
        .await
        .unwrap();

    assert!(prepared.documents.is_empty());
    assert!(prepared.citations.is_empty());
    assert_eq!(prepared.quality, SearchQualityLevel::None);
    assert!(prepared.rendered.starts_with("You are a Java tutor.\n\nSEARCH CONTEXT: No relevant documents found."));
    assert!(!prepared.was_truncated);
}

#[tokio::test]
async fn explicit_version_constrains_retrieval() {
    let store = store_with(&[
        doc("https://docs/25/records", "25", passage("records")),
        doc("https://docs/25/switch", "25", passage("pattern matching for switch")),
        doc("https://docs/21/records", "21", passage("records")),
        doc("https://docs/17/records", "17", passage("records")),
    ])
    .await;

    let prepared = pipeline(store, 5)
        .prepare(&PromptRequest::new("How do records work in Java 25?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.documents.len(), 2);
    assert!(prepared.documents.iter().all(|d| d.document.metadata_value("docVersion") == Some("25")));
    assert_eq!(prepared.citations.len(), 2);
    assert!(prepared.citations.iter().all(|url| url.starts_with("https://docs/25/")));
    assert_eq!(prepared.quality, SearchQualityLevel::HighQuality);
    assert!(prepared.rendered.contains("SEARCH CONTEXT: Found 2 high-quality relevant documents"));
    assert!(prepared.rendered.contains(&format!("[CTX 1] {}", prepared.citations[0])));
    assert!(prepared.rendered.contains("[CTX 2]"));
    // The boosted text is only embedded, never rendered.
    assert!(!prepared.rendered.contains("release features documentation"));
    assert!(prepared.rendered.ends_with("How do records work in Java 25?"));
}

#[tokio::test]
async fn duplicates_by_hash_and_url_are_dropped() {
    let store = store_with(&[
        doc("https://docs/a", "25", passage("streams")).with_metadata("hash", "h1"),
        doc("https://docs/b", "25", passage("streams")).with_metadata("hash", "h1"),
        doc("https://docs/c", "25", passage("collectors")),
        doc("https://docs/c", "25", passage("collectors and streams")),
    ])
    .await;

    let prepared = pipeline(store, 10)
        .prepare(&PromptRequest::new("streams and collectors"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.documents.len(), 2);
    let mut urls = prepared.citations.clone();
    urls.sort();
    assert_eq!(urls.len(), 2);
    assert!(urls.contains(&"https://docs/c".to_string()));
}

#[tokio::test]
async fn results_are_limited_to_return_k() {
    let documents: Vec<Document> = (0..8)
        .map(|i| doc(&format!("https://docs/{i}"), "25", passage(&format!("generics {i}"))))
        .collect();
    let store = store_with(&documents).await;

    let prepared = pipeline(store, 3)
        .prepare(&PromptRequest::new("generics"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.documents.len(), 3);
    assert_eq!(prepared.citations.len(), 3);
}

#[tokio::test]
async fn thin_results_add_low_quality_guidance() {
    let store = store_with(&[
        doc("https://docs/var", "25", "var infers local types"),
        doc("https://docs/var-long", "25", passage("var")),
    ])
    .await;

    let prepared = pipeline(store, 5)
        .prepare(&PromptRequest::new("local var types"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.quality, SearchQualityLevel::MixedQuality);
    assert!(prepared.quality_note.contains("(1 high-quality)"));
    assert!(prepared.rendered.contains("Note: Search results may be less relevant than usual."));
}

#[tokio::test]
async fn tight_budget_drops_least_relevant_documents_first() {
    let documents: Vec<Document> = (0..5)
        .map(|i| doc(&format!("https://docs/{i}"), "25", passage(&format!("sealed classes {i}"))))
        .collect();
    let store = store_with(&documents).await;
    let pipeline = pipeline(store, 5);
    let cancel = CancellationToken::new();
    let history = vec![
        HistoryTurn::new(Role::User, "What are sealed classes?"),
        HistoryTurn::new(Role::Assistant, "They restrict which classes may extend them."),
    ];

    let full = pipeline
        .prepare(&PromptRequest::new("sealed classes").with_history(history.clone()), &cancel)
        .await
        .unwrap();
    assert!(!full.was_truncated);
    assert_eq!(full.citations.len(), 5);

    let tight = pipeline
        .prepare(
            &PromptRequest::new("sealed classes")
                .with_history(history)
                .with_token_budget(full.total_tokens - 1),
            &cancel,
        )
        .await
        .unwrap();

    assert!(tight.was_truncated);
    assert!(tight.has_truncation_notice());
    assert!(tight.rendered.starts_with(&format!("{TRUNCATION_NOTICE}\n\nYou are a Java tutor.")));
    assert!(tight.total_tokens <= tight.token_budget);
    assert_eq!(tight.citations.len(), 4);
    assert_eq!(tight.citations[..], full.citations[..4]);
    // Conversation survives while documents can still be removed.
    assert!(tight.rendered.contains("Assistant: They restrict which classes may extend them."));
    assert!(tight.rendered.ends_with("sealed classes"));
}

#[tokio::test]
async fn history_renders_in_order_before_the_query() {
    let store = store_with(&[doc("https://docs/text-blocks", "25", passage("text blocks"))]).await;
    let request = PromptRequest::new("And how do I escape quotes?").with_history(vec![
        HistoryTurn::new(Role::User, "What are text blocks?"),
        HistoryTurn::new(Role::Assistant, "Multi-line string literals."),
    ]);

    let prepared = pipeline(store, 5).prepare(&request, &CancellationToken::new()).await.unwrap();

    let user = prepared.rendered.find("What are text blocks?").unwrap();
    let assistant = prepared.rendered.find("Assistant: Multi-line string literals.").unwrap();
    let query = prepared.rendered.find("And how do I escape quotes?").unwrap();
    assert!(user < assistant && assistant < query);
}

#[tokio::test]
async fn document_limits_shorten_passages() {
    let documents: Vec<Document> = (0..3)
        .map(|i| doc(&format!("https://docs/{i}"), "25", passage(&format!("modules {i}"))))
        .collect();
    let store = store_with(&documents).await;

    let prepared = pipeline(store, 5)
        .prepare(&PromptRequest::new("modules").with_document_limits(1, 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.documents.len(), 1);
    assert!(prepared.documents[0].document.text.ends_with(DOCUMENT_TRUNCATION_MARKER));
}

#[test]
fn huge_token_limit_leaves_passages_whole() {
    assert_eq!(truncate_to_token_limit("short passage", usize::MAX), "short passage");
}

#[tokio::test]
async fn huge_document_limits_keep_every_passage() {
    let documents: Vec<Document> = (0..2)
        .map(|i| doc(&format!("https://docs/{i}"), "25", passage(&format!("modules {i}"))))
        .collect();
    let store = store_with(&documents).await;

    let prepared = pipeline(store, 5)
        .prepare(
            &PromptRequest::new("modules").with_document_limits(usize::MAX, usize::MAX),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(prepared.documents.len(), 2);
    assert!(prepared.documents.iter().all(|d| !d.document.text.ends_with(DOCUMENT_TRUNCATION_MARKER)));
}

#[tokio::test]
async fn zero_document_limits_are_rejected() {
    let store = store_with(&[doc("https://docs/a", "25", passage("modules"))]).await;
    let pipeline = pipeline(store, 5);
    let cancel = CancellationToken::new();

    let mut request = PromptRequest::new("modules");
    request.max_documents = Some(0);
    let result = pipeline.prepare(&request, &cancel).await;
    assert!(matches!(result, Err(RagError::ConfigError(_))));

    let request = PromptRequest::new("modules").with_document_limits(3, 0);
    let result = pipeline.prepare(&request, &cancel).await;
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}

struct ReverseReranker;

#[async_trait]
impl Reranker for ReverseReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut documents: Vec<ScoredDocument>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        documents.reverse();
        documents.truncate(limit);
        Ok(documents)
    }
}

#[tokio::test]
async fn custom_reranker_controls_order() {
    let documents: Vec<Document> = (0..4)
        .map(|i| doc(&format!("https://docs/{i}"), "25", passage(&format!("switch {i}"))))
        .collect();
    let store = store_with(&documents).await;
    let cancel = CancellationToken::new();

    let baseline = pipeline(Arc::clone(&store), 4)
        .prepare(&PromptRequest::new("switch"), &cancel)
        .await
        .unwrap();

    let reranked = PromptPipeline::builder()
        .retrieval_config(retrieval_config(2))
        .retriever(store)
        .reranker(Arc::new(ReverseReranker))
        .build()
        .unwrap()
        .prepare(&PromptRequest::new("switch"), &cancel)
        .await
        .unwrap();

    let mut expected = baseline.citations.clone();
    expected.reverse();
    expected.truncate(2);
    assert_eq!(reranked.citations, expected);
}

#[tokio::test]
async fn unidentified_documents_are_kept_with_a_warning() {
    let store = store_with(&[
        Document::new(passage("annotations")),
        Document::new(passage("annotations processing")),
    ])
    .await;
    let capture = EventCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let prepared = pipeline(store, 5)
        .prepare(&PromptRequest::new("annotations"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.documents.len(), 2);
    let warnings = capture.events_at(Level::WARN);
    assert!(warnings.iter().any(|e| e.message.contains("neither hash nor url")));
    assert!(capture.contains_message("prompt prepared"));
}

#[tokio::test]
async fn cancellation_surfaces_as_error() {
    let store = store_with(&[doc("https://docs/a", "25", passage("records"))]).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline(store, 5).prepare(&PromptRequest::new("records"), &cancel).await;
    assert!(matches!(result, Err(RagError::Cancelled { .. })));
}

#[test]
fn zero_budget_is_a_config_error() {
    let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::default())));
    let result = PromptPipeline::builder()
        .retriever(store)
        .prompt_config(PromptConfig { token_budget: 0, ..PromptConfig::default() })
        .build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}
