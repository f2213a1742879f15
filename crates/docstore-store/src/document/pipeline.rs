use std::path::Path;

use docstore_llm::{EmbeddingProvider, LlmError};

use super::extract::{extract_text_from_path, extract_upload};
use super::{DEFAULT_MAX_FILE_SIZE, DocumentError, TextSplitter};
use crate::datastore::DataStore;
use crate::models::{ChunkMap, DeleteRequest, Document, DocumentMetadata, Query, QueryResult};

const DEFAULT_EMBED_BATCH_SIZE: usize = 100;

/// Split, embed and store documents; embed and run queries.
pub struct IngestionPipeline<S, E> {
    store: S,
    embedder: E,
    splitter: TextSplitter,
    embed_batch_size: usize,
    max_file_size: u64,
}

impl<S, E> std::fmt::Debug for IngestionPipeline<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("splitter", &self.splitter)
            .field("embed_batch_size", &self.embed_batch_size)
            .field("max_file_size", &self.max_file_size)
            .finish_non_exhaustive()
    }
}

impl<S: DataStore, E: EmbeddingProvider> IngestionPipeline<S, E> {
    pub fn new(store: S, embedder: E, splitter: TextSplitter) -> Self {
        Self {
            store,
            embedder,
            splitter,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    #[must_use]
    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocumentError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embed_batch_size) {
            let vectors = self.embedder.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(LlmError::EmbeddingCount {
                    provider: self.embedder.name(),
                    expected: batch.len(),
                    got: vectors.len(),
                }
                .into());
            }
            out.extend(vectors);
        }
        Ok(out)
    }

    /// Store `documents`, replacing previously stored chunks of documents that carry an id.
    ///
    /// Returns the ids of the documents written. Blank documents are skipped. Stale chunks
    /// are only deleted once every embedding has come back, so a failed embedding leaves
    /// the stored chunks untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding, deleting stale chunks or storage fails.
    pub async fn upsert(&self, documents: Vec<Document>) -> Result<Vec<String>, DocumentError> {
        let stale: Vec<String> = documents.iter().filter_map(|d| d.id.clone()).collect();

        let mut chunks = ChunkMap::new();
        for document in documents {
            let split = self.splitter.split(document);
            let Some(doc_id) = split.document.id else {
                continue;
            };
            if split.chunks.is_empty() {
                tracing::debug!(document_id = %doc_id, "skipping blank document");
                continue;
            }
            chunks.entry(doc_id).or_default().extend(split.chunks);
        }

        let texts: Vec<String> = chunks.values().flatten().map(|c| c.text.clone()).collect();
        if !texts.is_empty() {
            let mut embeddings = self.embed(&texts).await?.into_iter();
            for chunk in chunks.values_mut().flatten() {
                chunk.embedding = embeddings.next();
            }
        }

        if !stale.is_empty() {
            self.store.delete(DeleteRequest::by_ids(stale)).await?;
        }
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            documents = chunks.len(),
            chunks = texts.len(),
            embedder = self.embedder.name(),
            store = self.store.name(),
            "upserting documents"
        );
        Ok(self.store.upsert(chunks).await?)
    }

    /// # Errors
    ///
    /// Returns an error if embedding the query texts or the search fails.
    pub async fn query(&self, queries: Vec<Query>) -> Result<Vec<QueryResult>, DocumentError> {
        let texts: Vec<String> = queries.iter().map(|q| q.query.clone()).collect();
        let embeddings = self.embed(&texts).await?;
        let queries = queries
            .into_iter()
            .zip(embeddings)
            .map(|(q, e)| q.with_embedding(e))
            .collect();
        Ok(self.store.query(queries).await?)
    }

    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub async fn delete(&self, request: DeleteRequest) -> Result<bool, DocumentError> {
        Ok(self.store.delete(request).await?)
    }

    /// Extract a file and store it as one document.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or [`Self::upsert`] fails.
    pub async fn ingest_file(
        &self,
        path: &Path,
        mime: Option<&str>,
        id: Option<String>,
        metadata: Option<DocumentMetadata>,
    ) -> Result<Vec<String>, DocumentError> {
        let text = extract_text_from_path(path, mime, self.max_file_size).await?;
        self.upsert(vec![Document { id, text, metadata }]).await
    }

    /// Extract uploaded bytes and store them as one document.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or [`Self::upsert`] fails.
    pub async fn ingest_upload(
        &self,
        bytes: &[u8],
        mime: &str,
        metadata: Option<DocumentMetadata>,
    ) -> Result<Vec<String>, DocumentError> {
        let text = extract_upload(bytes, mime, self.max_file_size).await?;
        self.upsert(vec![Document {
            id: None,
            text,
            metadata,
        }])
        .await
    }
}
