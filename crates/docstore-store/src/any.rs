use crate::datastore::DataStore;
use crate::error::DatastoreError;
use crate::models::{ChunkMap, DeleteRequest, QueryResult, QueryWithEmbedding};
use crate::providers::{InMemoryDataStore, PineconeDataStore};

/// Generates a match over all `AnyDataStore` variants, binding the inner store
/// and evaluating the given expression for each arm.
macro_rules! delegate_store {
    ($self:expr, |$s:ident| $expr:expr) => {
        match $self {
            AnyDataStore::Pinecone($s) => $expr,
            AnyDataStore::Memory($s) => $expr,
        }
    };
}

/// A backend chosen at runtime.
#[derive(Debug)]
pub enum AnyDataStore {
    Pinecone(PineconeDataStore),
    Memory(InMemoryDataStore),
}

impl DataStore for AnyDataStore {
    async fn upsert(&self, chunks: ChunkMap) -> Result<Vec<String>, DatastoreError> {
        delegate_store!(self, |s| s.upsert(chunks).await)
    }

    async fn query(
        &self,
        queries: Vec<QueryWithEmbedding>,
    ) -> Result<Vec<QueryResult>, DatastoreError> {
        delegate_store!(self, |s| s.query(queries).await)
    }

    async fn delete(&self, request: DeleteRequest) -> Result<bool, DatastoreError> {
        delegate_store!(self, |s| s.delete(request).await)
    }

    fn name(&self) -> &'static str {
        delegate_store!(self, |s| s.name())
    }
}

impl From<PineconeDataStore> for AnyDataStore {
    fn from(store: PineconeDataStore) -> Self {
        Self::Pinecone(store)
    }
}

impl From<InMemoryDataStore> for AnyDataStore {
    fn from(store: InMemoryDataStore) -> Self {
        Self::Memory(store)
    }
}
