use std::future::Future;

use crate::error::DatastoreError;
use crate::models::{ChunkMap, DeleteRequest, QueryResult, QueryWithEmbedding};

/// Uniform contract over vector database backends.
pub trait DataStore: Send + Sync {
    /// Write chunks keyed by document id, replacing any with the same chunk id.
    ///
    /// Returns the document ids written.
    fn upsert(
        &self,
        chunks: ChunkMap,
    ) -> impl Future<Output = Result<Vec<String>, DatastoreError>> + Send;

    /// One result per query, in input order.
    fn query(
        &self,
        queries: Vec<QueryWithEmbedding>,
    ) -> impl Future<Output = Result<Vec<QueryResult>, DatastoreError>> + Send;

    fn delete(
        &self,
        request: DeleteRequest,
    ) -> impl Future<Output = Result<bool, DatastoreError>> + Send;

    fn name(&self) -> &'static str;
}

/// Reject chunk maps with any chunk lacking an embedding.
///
/// # Errors
///
/// Returns `MissingEmbedding` naming the first offending chunk.
pub fn validate_chunks(chunks: &ChunkMap) -> Result<(), DatastoreError> {
    let missing = chunks
        .values()
        .flatten()
        .find(|c| c.embedding.as_ref().is_none_or(Vec::is_empty));
    match missing {
        Some(chunk) => Err(DatastoreError::MissingEmbedding {
            chunk_id: chunk.id.clone(),
        }),
        None => Ok(()),
    }
}

/// # Errors
///
/// Returns `InvalidQuery` when `top_k` is zero or the embedding is empty.
pub fn validate_queries(queries: &[QueryWithEmbedding]) -> Result<(), DatastoreError> {
    for q in queries {
        if q.top_k == 0 {
            return Err(DatastoreError::InvalidQuery(format!(
                "top_k must be positive for query {:?}",
                q.query
            )));
        }
        if q.embedding.is_empty() {
            return Err(DatastoreError::InvalidQuery(format!(
                "query {:?} has an empty embedding",
                q.query
            )));
        }
    }
    Ok(())
}
