//! Vector document store: chunk model, metadata filters, Pinecone and
//! in-memory backends, and document ingestion.

pub mod any;
pub mod datastore;
pub mod date;
pub mod document;
pub mod error;
pub mod factory;
pub mod filter;
pub mod models;
pub mod payload;
pub mod providers;
pub mod retry;

pub use any::AnyDataStore;
pub use datastore::DataStore;
pub use error::DatastoreError;
pub use factory::{StoreConfig, create_datastore, supported_backends, validate_backend};
pub use filter::VectorFilter;
pub use models::{
    ChunkMap, DeleteRequest, Document, DocumentChunk, DocumentChunkMetadata,
    DocumentChunkWithScore, DocumentMetadata, DocumentMetadataFilter, DocumentWithChunks, Query,
    QueryResult, QueryWithEmbedding, Source,
};
pub use providers::{InMemoryDataStore, PineconeConfig, PineconeDataStore};
pub use retry::RetryPolicy;
