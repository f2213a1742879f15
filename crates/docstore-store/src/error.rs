#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{backend} returned status {status}: {body}")]
    Backend {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("unsupported vector database: {requested}. Try one of the following: {}", supported.join(", "))]
    UnsupportedBackend {
        requested: String,
        supported: Vec<&'static str>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("chunk {chunk_id} has no embedding")]
    MissingEmbedding { chunk_id: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("{0}")]
    Other(String),
}

impl DatastoreError {
    /// Transport failures (not undecodable bodies), rate limits and server-side errors are worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_decode(),
            Self::Backend { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
