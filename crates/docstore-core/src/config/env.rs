use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DOCSTORE_DATASTORE") {
            self.datastore.backend = v;
        }
        if let Ok(v) = std::env::var("DOCSTORE_PINECONE_ENVIRONMENT") {
            self.pinecone.environment = Some(v);
        }
        if let Ok(v) = std::env::var("DOCSTORE_PINECONE_INDEX") {
            self.pinecone.index = Some(v);
        }
        if let Ok(v) = std::env::var("DOCSTORE_PINECONE_DIMENSION") {
            if let Ok(dim) = v.parse::<usize>() {
                self.pinecone.dimension = dim;
            } else {
                tracing::warn!("ignoring invalid DOCSTORE_PINECONE_DIMENSION value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCSTORE_UPSERT_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.pinecone.batch_size = n;
        }
        if let Ok(v) = std::env::var("DOCSTORE_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("DOCSTORE_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("DOCSTORE_RETRY_MAX_ATTEMPTS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.retry.max_attempts = n;
        }
        if let Ok(v) = std::env::var("DOCSTORE_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.chunk_size = n;
        }
    }
}
