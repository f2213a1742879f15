use serde::Deserialize;

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datastore: DatastoreConfig,
    #[serde(default)]
    pub pinecone: PineconeSettings,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_backend() -> String {
    "pinecone".into()
}

#[derive(Debug, Deserialize)]
pub struct DatastoreConfig {
    /// Registered backend name: `pinecone` or `memory`.
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

fn default_dimension() -> usize {
    docstore_store::providers::pinecone::DEFAULT_DIMENSION
}

fn default_upsert_batch_size() -> usize {
    docstore_store::providers::pinecone::DEFAULT_UPSERT_BATCH_SIZE
}

#[derive(Debug, Deserialize)]
pub struct PineconeSettings {
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_upsert_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub controller_url: Option<String>,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            environment: None,
            index: None,
            dimension: default_dimension(),
            batch_size: default_upsert_batch_size(),
            controller_url: None,
        }
    }
}

fn default_embedding_model() -> String {
    docstore_llm::gemini::DEFAULT_EMBEDDING_MODEL.into()
}

fn default_embedding_base_url() -> String {
    docstore_llm::gemini::DEFAULT_BASE_URL.into()
}

fn default_embedding_max_retries() -> u32 {
    3
}

fn default_embedding_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    /// Retries on HTTP 429.
    #[serde(default = "default_embedding_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            max_retries: default_embedding_max_retries(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_min_delay_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_max_file_size() -> u64 {
    docstore_store::document::DEFAULT_MAX_FILE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Secrets resolved at runtime through a vault, never read from the TOML file.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub pinecone_api_key: Option<Secret>,
    pub gemini_api_key: Option<Secret>,
}
