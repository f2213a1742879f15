use std::collections::HashMap;
use std::sync::RwLock;

use crate::datastore::{DataStore, validate_chunks, validate_queries};
use crate::error::DatastoreError;
use crate::filter::VectorFilter;
use crate::models::{ChunkMap, DeleteRequest, QueryResult, QueryWithEmbedding};
use crate::payload::{Payload, chunk_payload, scored_chunk};

struct StoredVector {
    vector: Vec<f32>,
    payload: Payload,
}

/// Process-local backend ranking records by cosine similarity.
pub struct InMemoryDataStore {
    records: RwLock<HashMap<String, StoredVector>>,
}

impl InMemoryDataStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, DatastoreError> {
        Ok(self.read()?.len())
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DatastoreError> {
        Ok(self.len()? == 0)
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, StoredVector>>, DatastoreError> {
        self.records
            .read()
            .map_err(|e| DatastoreError::Other(e.to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, StoredVector>>, DatastoreError>
    {
        self.records
            .write()
            .map_err(|e| DatastoreError::Other(e.to_string()))
    }
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDataStore").finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl DataStore for InMemoryDataStore {
    async fn upsert(&self, chunks: ChunkMap) -> Result<Vec<String>, DatastoreError> {
        validate_chunks(&chunks)?;
        let mut records = self.write()?;
        let mut doc_ids = Vec::with_capacity(chunks.len());
        for (doc_id, doc_chunks) in chunks {
            for chunk in doc_chunks {
                let payload = chunk_payload(&doc_id, &chunk);
                records.insert(
                    chunk.id,
                    StoredVector {
                        vector: chunk.embedding.unwrap_or_default(),
                        payload,
                    },
                );
            }
            doc_ids.push(doc_id);
        }
        Ok(doc_ids)
    }

    async fn query(
        &self,
        queries: Vec<QueryWithEmbedding>,
    ) -> Result<Vec<QueryResult>, DatastoreError> {
        validate_queries(&queries)?;
        let records = self.read()?;
        let results = queries
            .into_iter()
            .map(|q| {
                let filter = q.filter.as_ref().map(VectorFilter::from).unwrap_or_default();
                let mut scored: Vec<(&String, f32, &StoredVector)> = records
                    .iter()
                    .filter(|(_, r)| filter.matches(&r.payload))
                    .map(|(id, r)| (id, cosine_similarity(&q.embedding, &r.vector), r))
                    .collect();
                scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                scored.truncate(q.top_k);
                QueryResult {
                    query: q.query,
                    results: scored
                        .into_iter()
                        .map(|(id, score, r)| scored_chunk(id.clone(), score, r.payload.clone()))
                        .collect(),
                }
            })
            .collect();
        Ok(results)
    }

    async fn delete(&self, request: DeleteRequest) -> Result<bool, DatastoreError> {
        let mut records = self.write()?;
        if request.delete_all {
            records.clear();
            return Ok(true);
        }
        if let Some(filter) = request.filter() {
            let filter = VectorFilter::from(filter);
            records.retain(|_, r| !filter.matches(&r.payload));
        }
        if let Some(ids) = request.ids() {
            let filter = VectorFilter::document_ids(ids);
            records.retain(|_, r| !filter.matches(&r.payload));
        }
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DocumentChunk, DocumentChunkMetadata, DocumentMetadataFilter, Query, Source,
    };

    fn chunk(id: &str, text: &str, embedding: Vec<f32>, source: Source) -> DocumentChunk {
        DocumentChunk {
            id: id.into(),
            text: text.into(),
            metadata: DocumentChunkMetadata {
                source: Some(source),
                ..Default::default()
            },
            embedding: Some(embedding),
        }
    }

    async fn seeded() -> InMemoryDataStore {
        let store = InMemoryDataStore::new();
        let mut map = ChunkMap::new();
        map.insert(
            "a".into(),
            vec![chunk("a_0", "alpha", vec![1.0, 0.0], Source::File)],
        );
        map.insert(
            "b".into(),
            vec![chunk("b_0", "beta", vec![0.0, 1.0], Source::Email)],
        );
        map.insert(
            "c".into(),
            vec![chunk("c_0", "gamma", vec![0.7, 0.7], Source::Chat)],
        );
        store.upsert(map).await.unwrap();
        store
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn upsert_returns_document_ids_in_order() {
        let store = InMemoryDataStore::new();
        let mut map = ChunkMap::new();
        map.insert("z".into(), vec![chunk("z_0", "z", vec![1.0], Source::File)]);
        map.insert("m".into(), vec![chunk("m_0", "m", vec![1.0], Source::File)]);
        let ids = store.upsert(map).await.unwrap();
        assert_eq!(ids, vec!["m".to_owned(), "z".to_owned()]);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn upsert_replaces_by_chunk_id() {
        let store = seeded().await;
        let mut map = ChunkMap::new();
        map.insert(
            "a".into(),
            vec![chunk("a_0", "alpha v2", vec![1.0, 0.0], Source::File)],
        );
        store.upsert(map).await.unwrap();
        assert_eq!(store.len().unwrap(), 3);

        let res = store
            .query(vec![Query::new("q").with_top_k(1).with_embedding(vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(res[0].results[0].text, "alpha v2");
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let store = seeded().await;
        let res = store
            .query(vec![Query::new("q").with_embedding(vec![1.0, 0.1])])
            .await
            .unwrap();
        let ids: Vec<_> = res[0].results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a_0", "c_0", "b_0"]);
    }

    #[tokio::test]
    async fn query_applies_filter() {
        let store = seeded().await;
        let q = Query::new("q")
            .with_filter(DocumentMetadataFilter {
                source: Some(Source::Email),
                ..Default::default()
            })
            .with_embedding(vec![1.0, 0.0]);
        let res = store.query(vec![q]).await.unwrap();
        assert_eq!(res[0].results.len(), 1);
        assert_eq!(res[0].results[0].id, "b_0");
    }

    #[tokio::test]
    async fn delete_by_filter_and_ids_combine() {
        let store = seeded().await;
        let req = DeleteRequest {
            ids: Some(vec!["a".into()]),
            filter: Some(DocumentMetadataFilter {
                source: Some(Source::Email),
                ..Default::default()
            }),
            delete_all: false,
        };
        assert!(store.delete(req).await.unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_all_ignores_other_arguments() {
        let store = seeded().await;
        let req = DeleteRequest {
            ids: Some(vec!["nothing".into()]),
            filter: None,
            delete_all: true,
        };
        store.delete(req).await.unwrap();
        assert!(store.is_empty().unwrap());
    }
}
