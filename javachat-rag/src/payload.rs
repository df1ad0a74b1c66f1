//! Mapping between [`Document`]s and index payloads.
//!
//! Only allow-listed metadata keys reach the index. String keys are copied
//! verbatim; integer keys are parsed and dropped when unparseable. The
//! passage text always lives under [`TEXT_FIELD`].

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::vectorstore::{IndexHit, Payload};

/// Payload field holding the full passage text.
pub const TEXT_FIELD: &str = "doc_content";

/// Metadata keys stored as strings.
pub const STRING_FIELDS: [&str; 20] = [
    "url",
    "title",
    "package",
    "hash",
    "docSet",
    "docPath",
    "sourceName",
    "sourceKind",
    "docVersion",
    "docType",
    "filePath",
    "language",
    "repoUrl",
    "repoOwner",
    "repoName",
    "repoKey",
    "repoBranch",
    "commitHash",
    "license",
    "repoDescription",
];

/// Metadata keys stored as integers.
pub const INTEGER_FIELDS: [&str; 3] = ["chunkIndex", "pageStart", "pageEnd"];

/// Build the index payload for `document`.
pub fn build_payload(document: &Document) -> Payload {
    let mut payload = Payload::new();
    payload.insert(TEXT_FIELD.to_string(), Value::String(document.text.clone()));

    for key in STRING_FIELDS {
        if let Some(value) = document.metadata_value(key) {
            payload.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    for key in INTEGER_FIELDS {
        if let Some(number) = document.metadata_value(key).and_then(|v| v.trim().parse::<i64>().ok())
        {
            payload.insert(key.to_string(), Value::from(number));
        }
    }
    payload
}

/// Reconstruct a document from an index hit.
pub fn document_from_hit(hit: &IndexHit) -> Document {
    let text = match hit.payload.get(TEXT_FIELD) {
        Some(Value::String(text)) => text.clone(),
        _ => String::new(),
    };
    let metadata: HashMap<String, String> = hit
        .payload
        .iter()
        .filter(|(key, _)| key.as_str() != TEXT_FIELD)
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key.clone(), s.clone())),
            Value::Number(n) => Some((key.clone(), n.to_string())),
            Value::Bool(b) => Some((key.clone(), b.to_string())),
            _ => None,
        })
        .collect();
    Document { id: hit.id.clone(), text, metadata }
}

/// Point id for `document`: its own id when set, otherwise a fresh UUID.
///
/// # Errors
///
/// Returns [`RagError::InvalidArgument`] if a non-blank id is not a UUID.
pub fn resolve_point_id(document: &Document) -> Result<String> {
    let id = document.id.trim();
    if id.is_empty() {
        return Ok(Uuid::new_v4().to_string());
    }
    Uuid::parse_str(id).map(|uuid| uuid.to_string()).map_err(|e| {
        RagError::InvalidArgument(format!("document id '{id}' is not a UUID: {e}"))
    })
}
