//! Chunk, metadata and query records shared by every backend.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Email,
    File,
    Chat,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Email, Source::File, Source::Chat];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::File => "file",
            Self::Chat => "chat",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| UnknownSource(s.to_owned()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Date string in any format understood by [`crate::date::parse_timestamp`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl DocumentChunkMetadata {
    /// Metadata fields declared as filterable when an index is created.
    pub const INDEXED_FIELDS: [&'static str; 6] = [
        "source",
        "source_id",
        "url",
        "created_at",
        "author",
        "document_id",
    ];

    #[must_use]
    pub fn from_document(document_id: &str, metadata: Option<&DocumentMetadata>) -> Self {
        let metadata = metadata.cloned().unwrap_or_default();
        Self {
            source: metadata.source,
            source_id: metadata.source_id,
            url: metadata.url,
            created_at: metadata.created_at,
            author: metadata.author,
            document_id: Some(document_id.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: DocumentChunkMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunkWithScore {
    pub id: String,
    pub text: String,
    pub metadata: DocumentChunkMetadata,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWithChunks {
    #[serde(flatten)]
    pub document: Document,
    pub chunks: Vec<DocumentChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadataFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl DocumentMetadataFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.document_id.is_none()
            && self.source.is_none()
            && self.source_id.is_none()
            && self.author.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

pub const DEFAULT_TOP_K: usize = 3;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DocumentMetadataFilter>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Query {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filter: None,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: DocumentMetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_embedding(self, embedding: Vec<f32>) -> QueryWithEmbedding {
        QueryWithEmbedding {
            query: self.query,
            filter: self.filter,
            top_k: self.top_k,
            embedding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryWithEmbedding {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DocumentMetadataFilter>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub results: Vec<DocumentChunkWithScore>,
}

/// Arguments of a delete call.
///
/// `delete_all` wins over everything else; otherwise `filter` and `ids` are
/// applied independently and their effects combine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DocumentMetadataFilter>,
    #[serde(default)]
    pub delete_all: bool,
}

impl DeleteRequest {
    #[must_use]
    pub fn all() -> Self {
        Self {
            delete_all: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_filter(filter: DocumentMetadataFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// Document ids to delete, if any were given.
    #[must_use]
    pub fn ids(&self) -> Option<&[String]> {
        self.ids.as_deref().filter(|ids| !ids.is_empty())
    }

    /// The filter to delete by, if one was given and it constrains something.
    #[must_use]
    pub fn filter(&self) -> Option<&DocumentMetadataFilter> {
        self.filter.as_ref().filter(|f| !f.is_empty())
    }
}

/// Chunks to upsert keyed by document id. Iteration order is batch order.
pub type ChunkMap = BTreeMap<String, Vec<DocumentChunk>>;
