use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;
use crate::retry::send_with_retry;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
/// Output size of `models/embedding-001`.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

const MAX_BATCH_SIZE: usize = 100;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Gemini `batchEmbedContents` client.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl fmt::Debug for GeminiEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiEmbedder")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    /// `model` may be given with or without the `models/` prefix.
    #[must_use]
    pub fn new(api_key: impl Into<String>, mut base_url: String, model: &str) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let model = if model.starts_with("models/") {
            model.to_owned()
        } else {
            format!("models/{model}")
        };
        Self {
            client: crate::http::default_client(),
            api_key: api_key.into(),
            base_url,
            model,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &self.model,
                    content: Content {
                        parts: [Part { text }],
                    },
                })
                .collect(),
        };
        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);

        let response = send_with_retry("gemini", self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!(%status, body = %text, "Gemini embedding API error");
            return Err(LlmError::Status {
                provider: "gemini",
                status: status.as_u16(),
            });
        }

        let resp: BatchEmbedResponse = serde_json::from_str(&text)?;
        if resp.embeddings.is_empty() {
            return Err(LlmError::EmptyResponse { provider: "gemini" });
        }
        if resp.embeddings.len() != texts.len() {
            return Err(LlmError::EmbeddingCount {
                provider: "gemini",
                expected: texts.len(),
                got: resp.embeddings.len(),
            });
        }

        Ok(resp.embeddings.into_iter().map(|e| e.values).collect())
    }
}

impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            tracing::debug!(model = %self.model, size = batch.len(), "embedding batch");
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
