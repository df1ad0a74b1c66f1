//! Subcommand handlers.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use javachat_core::{RetrievalConstraint, version};
use javachat_rag::{
    CancellationToken, Document, HashingEmbeddingProvider, HistoryTurn, InMemoryVectorStore,
    PreparedPrompt, PromptConfig, PromptPipeline, PromptRequest, RetrievalConfig, Retriever,
    SystemPromptTemplate,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::cli::PromptArgs;

/// One entry of the `--docs` file.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInput {
    /// UUID point id; generated when absent.
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Target collection; the docs collection when absent.
    #[serde(default)]
    pub collection: Option<String>,
}

impl DocumentInput {
    fn into_document(self) -> (Option<String>, Document) {
        let mut document = Document::new(self.text).with_id(self.id);
        document.metadata = self.metadata;
        if let Some(url) = self.url {
            document = document.with_metadata("url", url);
        }
        if let Some(title) = self.title {
            document = document.with_metadata("title", title);
        }
        (self.collection, document)
    }
}

pub fn parse_documents(json: &str) -> Result<Vec<DocumentInput>> {
    let documents: Vec<DocumentInput> =
        serde_json::from_str(json).context("documents must be a JSON array of objects with `text`")?;
    if documents.is_empty() {
        bail!("no documents to index");
    }
    Ok(documents)
}

pub fn parse_history(json: &str) -> Result<Vec<HistoryTurn>> {
    serde_json::from_str(json)
        .context("history must be a JSON array of {\"role\": \"user\"|\"assistant\", \"text\": ...}")
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Index `documents` in a fresh in-memory store and prepare the prompt.
pub async fn prepare(
    args: &PromptArgs,
    documents: Vec<DocumentInput>,
    history: Vec<HistoryTurn>,
    system: Option<String>,
) -> Result<PreparedPrompt> {
    let retrieval = RetrievalConfig::builder()
        .top_k(args.top_k)
        .return_k(args.return_k)
        .build()
        .context("invalid retrieval settings")?;

    let cancel = CancellationToken::new();
    let store = Arc::new(InMemoryVectorStore::new(Arc::new(HashingEmbeddingProvider::new(
        args.dimensions,
    ))));

    let mut by_collection: BTreeMap<String, Vec<Document>> = BTreeMap::new();
    for input in documents {
        let (collection, document) = input.into_document();
        let collection = collection.unwrap_or_else(|| retrieval.collections.docs.clone());
        by_collection.entry(collection).or_default().push(document);
    }
    for (collection, documents) in &by_collection {
        store
            .upsert(collection, documents, &cancel)
            .await
            .with_context(|| format!("failed to index documents into {collection}"))?;
    }
    info!(documents = store.len(), collections = by_collection.len(), "seeded in-memory store");

    let template = match system {
        Some(core) => SystemPromptTemplate::new(core),
        None => SystemPromptTemplate::default(),
    }
    .with_jdk_version(args.jdk_version.clone());

    let pipeline = PromptPipeline::builder()
        .retrieval_config(retrieval)
        .prompt_config(PromptConfig { system: template, token_budget: args.budget })
        .retriever(store)
        .build()
        .context("invalid prompt settings")?;

    let request = PromptRequest::new(args.query.clone()).with_history(history);
    Ok(pipeline.prepare(&request, &cancel).await?)
}

pub fn write_prepared(prepared: &PreparedPrompt, as_json: bool, out: &mut impl Write) -> Result<()> {
    if as_json {
        serde_json::to_writer_pretty(&mut *out, prepared)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{}", prepared.rendered)?;
    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(out, "quality: {} ({})", prepared.quality, prepared.quality_note)?;
    writeln!(
        out,
        "tokens: {} / {}{}",
        prepared.total_tokens,
        prepared.token_budget,
        if prepared.was_truncated { " (truncated)" } else { "" }
    )?;
    for (i, url) in prepared.citations.iter().enumerate() {
        writeln!(out, "[{}] {url}", i + 1)?;
    }
    for notice in &prepared.notices {
        writeln!(out, "notice: {notice}")?;
    }
    Ok(())
}

/// `javachat prompt`.
pub async fn run_prompt(args: &PromptArgs, out: &mut impl Write) -> Result<()> {
    let documents = parse_documents(&read(&args.docs)?)?;
    let history = match &args.history {
        Some(path) => parse_history(&read(path)?)?,
        None => Vec::new(),
    };
    let system = args.system.as_deref().map(read).transpose()?;

    let prepared = prepare(args, documents, history, system).await?;
    write_prepared(&prepared, args.json, out)
}

/// `javachat analyze`.
pub fn run_analyze(query: &str, out: &mut impl Write) -> Result<()> {
    let patterns = version::extract_filter_patterns(query);
    let constraint = RetrievalConstraint::from_version_patterns(patterns.as_ref());
    let server_side = constraint.has_server_side_constraint();
    let report = json!({
        "version": version::extract_version_number(query),
        "source": version::extract_source_identifier(query),
        "boosted_query": version::boost_query_with_version_context(query),
        "url_tokens": patterns.as_ref().map(|p| p.url_tokens().to_vec()).unwrap_or_default(),
        "text_tokens": patterns.as_ref().map(|p| p.text_tokens().to_vec()).unwrap_or_default(),
        "constraint": constraint,
        "server_side": server_side,
    });
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}
