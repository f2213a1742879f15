pub mod memory;
pub mod pinecone;
pub mod pinecone_ops;

pub use memory::InMemoryDataStore;
pub use pinecone::{PineconeConfig, PineconeDataStore};
