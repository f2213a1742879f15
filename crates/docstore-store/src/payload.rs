//! Conversion between chunks and the flat records stored in a backend.

use std::collections::HashMap;

use serde_json::Value;

use crate::date::{format_timestamp, to_unix_timestamp};
use crate::models::{DocumentChunk, DocumentChunkMetadata, DocumentChunkWithScore, Source};

pub type Payload = HashMap<String, Value>;

/// Flatten a chunk into a backend record.
///
/// `created_at` becomes Unix seconds; `text` and `document_id` are always set.
#[must_use]
pub fn chunk_payload(document_id: &str, chunk: &DocumentChunk) -> Payload {
    let meta = &chunk.metadata;
    let mut payload = Payload::new();

    if let Some(source) = meta.source {
        payload.insert("source".into(), Value::from(source.as_str()));
    }
    for (key, value) in [
        ("source_id", &meta.source_id),
        ("url", &meta.url),
        ("author", &meta.author),
    ] {
        if let Some(v) = value {
            payload.insert(key.into(), Value::from(v.as_str()));
        }
    }
    if let Some(created_at) = &meta.created_at {
        payload.insert("created_at".into(), Value::from(to_unix_timestamp(created_at)));
    }
    payload.insert("text".into(), Value::from(chunk.text.as_str()));
    payload.insert("document_id".into(), Value::from(document_id));
    payload
}

fn text_field(payload: &mut Payload, key: &str) -> Option<String> {
    match payload.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Build a scored chunk from a backend hit.
///
/// Sources outside the known set are dropped rather than rejected.
#[must_use]
pub fn scored_chunk(id: String, score: f32, mut payload: Payload) -> DocumentChunkWithScore {
    let text = text_field(&mut payload, "text").unwrap_or_default();

    let source = payload
        .remove("source")
        .and_then(|v| v.as_str().and_then(|s| s.parse::<Source>().ok()));

    let created_at = payload.remove("created_at").and_then(|v| match v {
        Value::Number(n) => n.as_i64().map(format_timestamp),
        Value::String(s) => Some(s),
        _ => None,
    });

    DocumentChunkWithScore {
        id,
        text,
        metadata: DocumentChunkMetadata {
            source,
            source_id: text_field(&mut payload, "source_id"),
            url: text_field(&mut payload, "url"),
            created_at,
            author: text_field(&mut payload, "author"),
            document_id: text_field(&mut payload, "document_id"),
        },
        score,
    }
}
