use std::fmt;

use futures::future::try_join_all;

use super::pinecone_ops::{
    PineconeOps, Vector, controller_url, normalize_host, pinecone_filter,
};
use crate::datastore::{DataStore, validate_chunks, validate_queries};
use crate::error::DatastoreError;
use crate::filter::VectorFilter;
use crate::models::{
    ChunkMap, DeleteRequest, DocumentChunkMetadata, QueryResult, QueryWithEmbedding,
};
use crate::payload::{chunk_payload, scored_chunk};
use crate::retry::RetryPolicy;

pub const DEFAULT_DIMENSION: usize = 768;
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 5;

/// Connection settings for a Pinecone index.
#[derive(Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub environment: String,
    pub index: String,
    pub dimension: usize,
    pub batch_size: usize,
    /// Overrides `https://controller.{environment}.pinecone.io`.
    pub controller_url: Option<String>,
}

impl PineconeConfig {
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        environment: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            environment: environment.into(),
            index: index.into(),
            dimension: DEFAULT_DIMENSION,
            batch_size: DEFAULT_UPSERT_BATCH_SIZE,
            controller_url: None,
        }
    }

    #[must_use]
    pub fn with_controller_url(mut self, url: impl Into<String>) -> Self {
        self.controller_url = Some(url.into());
        self
    }
}

impl fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("index", &self.index)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .field("controller_url", &self.controller_url)
            .finish()
    }
}

/// [`DataStore`] backed by a Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeDataStore {
    ops: PineconeOps,
    host: String,
    index: String,
    batch_size: usize,
    retry: RetryPolicy,
}

impl PineconeDataStore {
    /// Attach to `config.index`, creating it first if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be listed, created or described,
    /// or if it reports no host.
    pub async fn connect(config: &PineconeConfig, retry: RetryPolicy) -> Result<Self, DatastoreError> {
        for (name, value) in [
            ("api_key", &config.api_key),
            ("environment", &config.environment),
            ("index", &config.index),
        ] {
            if value.trim().is_empty() {
                return Err(DatastoreError::Config(format!("pinecone {name} is required")));
            }
        }

        let controller = config
            .controller_url
            .clone()
            .unwrap_or_else(|| controller_url(&config.environment));
        let ops = PineconeOps::new(
            docstore_llm::http::default_client(),
            config.api_key.clone(),
            &controller,
        );
        let index = config.index.as_str();

        let existing = retry.run("list_indexes", || ops.list_indexes()).await?;
        if existing.iter().any(|name| name == index) {
            tracing::info!(index, "connecting to existing pinecone index");
        } else {
            tracing::info!(
                index,
                dimension = config.dimension,
                fields = ?DocumentChunkMetadata::INDEXED_FIELDS,
                "creating pinecone index"
            );
            retry
                .run("create_index", || {
                    ops.create_index(
                        index,
                        config.dimension,
                        &DocumentChunkMetadata::INDEXED_FIELDS,
                    )
                })
                .await?;
        }

        let description = retry
            .run("describe_index", || ops.describe_index(index))
            .await?;
        let host = description
            .status
            .host
            .filter(|h| !h.trim().is_empty())
            .map(|h| normalize_host(&h))
            .ok_or_else(|| DatastoreError::Config(format!("pinecone index {index} has no host")))?;
        tracing::info!(index, %host, ready = description.status.ready, "pinecone index attached");

        Ok(Self {
            ops,
            host,
            index: config.index.clone(),
            batch_size: config.batch_size.max(1),
            retry,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }
}

async fn single_query(
    ops: &PineconeOps,
    host: &str,
    query: &QueryWithEmbedding,
) -> Result<QueryResult, DatastoreError> {
    let filter = query
        .filter
        .as_ref()
        .map(VectorFilter::from)
        .filter(|f| !f.is_empty())
        .map(|f| pinecone_filter(&f));

    let matches = ops
        .query(host, &query.embedding, query.top_k, filter.as_ref())
        .await?;

    let results = matches
        .into_iter()
        .map(|m| scored_chunk(m.id, m.score, m.metadata.unwrap_or_default()))
        .collect();

    Ok(QueryResult {
        query: query.query.clone(),
        results,
    })
}

impl DataStore for PineconeDataStore {
    async fn upsert(&self, chunks: ChunkMap) -> Result<Vec<String>, DatastoreError> {
        validate_chunks(&chunks)?;

        let mut doc_ids = Vec::with_capacity(chunks.len());
        let mut vectors = Vec::new();
        for (doc_id, doc_chunks) in chunks {
            for chunk in doc_chunks {
                let metadata = chunk_payload(&doc_id, &chunk);
                vectors.push(Vector {
                    id: chunk.id,
                    values: chunk.embedding.unwrap_or_default(),
                    metadata,
                });
            }
            doc_ids.push(doc_id);
        }

        let ops = &self.ops;
        let host = self.host.as_str();
        for (i, batch) in vectors.chunks(self.batch_size).enumerate() {
            tracing::info!(index = %self.index, batch = i, size = batch.len(), "upserting batch");
            let upserted = self
                .retry
                .run("upsert", || ops.upsert(host, batch))
                .await?;
            tracing::debug!(batch = i, upserted, "batch upserted");
        }

        Ok(doc_ids)
    }

    async fn query(
        &self,
        queries: Vec<QueryWithEmbedding>,
    ) -> Result<Vec<QueryResult>, DatastoreError> {
        validate_queries(&queries)?;
        tracing::debug!(index = %self.index, count = queries.len(), "querying");

        let ops = &self.ops;
        let host = self.host.as_str();
        let queries = &queries;
        self.retry
            .run("query", || {
                try_join_all(queries.iter().map(|q| single_query(ops, host, q)))
            })
            .await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<bool, DatastoreError> {
        let ops = &self.ops;
        let host = self.host.as_str();

        if request.delete_all {
            tracing::info!(index = %self.index, "deleting all vectors");
            self.retry
                .run("delete_all", || ops.delete(host, true, None))
                .await?;
            return Ok(true);
        }

        if let Some(filter) = request.filter() {
            let filter = pinecone_filter(&VectorFilter::from(filter));
            tracing::info!(index = %self.index, %filter, "deleting by filter");
            let filter = &filter;
            self.retry
                .run("delete_by_filter", || ops.delete(host, false, Some(filter)))
                .await?;
        }

        if let Some(ids) = request.ids() {
            let filter = pinecone_filter(&VectorFilter::document_ids(ids));
            tracing::info!(index = %self.index, count = ids.len(), "deleting by document id");
            let filter = &filter;
            self.retry
                .run("delete_by_ids", || ops.delete(host, false, Some(filter)))
                .await?;
        }

        Ok(true)
    }

    fn name(&self) -> &'static str {
        "pinecone"
    }
}
