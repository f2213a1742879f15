//! Low-level Pinecone REST operations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DatastoreError;
use crate::filter::{Condition, FieldValue, VectorFilter};
use crate::payload::Payload;

const BACKEND: &str = "pinecone";

#[derive(Debug, Clone, Serialize)]
pub struct Vector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Payload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Payload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexDescription {
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    metadata_config: MetadataConfig<'a>,
}

#[derive(Serialize)]
struct MetadataConfig<'a> {
    indexed: &'a [&'a str],
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [Vector],
}

#[derive(Deserialize)]
struct UpsertResponse {
    #[serde(default, rename = "upsertedCount")]
    upserted_count: usize,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    #[serde(rename = "deleteAll", skip_serializing_if = "std::ops::Not::not")]
    delete_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
}

/// Thin wrapper over the Pinecone controller and index REST endpoints.
#[derive(Clone)]
pub struct PineconeOps {
    client: reqwest::Client,
    api_key: String,
    controller_url: String,
}

impl std::fmt::Debug for PineconeOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeOps")
            .field("controller_url", &self.controller_url)
            .finish_non_exhaustive()
    }
}

/// Controller endpoint for a Pinecone environment.
#[must_use]
pub fn controller_url(environment: &str) -> String {
    format!("https://controller.{environment}.pinecone.io")
}

/// Index hosts come back without a scheme.
#[must_use]
pub fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_owned()
    } else {
        format!("https://{host}")
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, DatastoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DatastoreError::Backend {
        backend: BACKEND,
        status: status.as_u16(),
        body,
    })
}

impl PineconeOps {
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, controller_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            controller_url: controller_url.trim_end_matches('/').to_owned(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the controller cannot be reached or rejects the request.
    pub async fn list_indexes(&self) -> Result<Vec<String>, DatastoreError> {
        let response = self
            .client
            .get(format!("{}/databases", self.controller_url))
            .header("Api-Key", &self.api_key)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Create a cosine index declaring `indexed` as filterable metadata fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the request.
    pub async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        indexed: &[&str],
    ) -> Result<(), DatastoreError> {
        let body = CreateIndexRequest {
            name,
            dimension,
            metric: "cosine",
            metadata_config: MetadataConfig { indexed },
        };
        let response = self
            .client
            .post(format!("{}/databases", self.controller_url))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the index does not exist or the controller fails.
    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription, DatastoreError> {
        let response = self
            .client
            .get(format!("{}/databases/{name}", self.controller_url))
            .header("Api-Key", &self.api_key)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// # Errors
    ///
    /// Returns an error if the index rejects the batch.
    pub async fn upsert(&self, host: &str, vectors: &[Vector]) -> Result<usize, DatastoreError> {
        let response = self
            .client
            .post(format!("{host}/vectors/upsert"))
            .header("Api-Key", &self.api_key)
            .json(&UpsertRequest { vectors })
            .send()
            .await?;
        let text = check(response).await?.text().await?;
        let count = serde_json::from_str::<UpsertResponse>(&text)
            .map_or(vectors.len(), |r| r.upserted_count);
        Ok(count)
    }

    /// Nearest-neighbour search with metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails or the response cannot be parsed.
    pub async fn query(
        &self,
        host: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Value>,
    ) -> Result<Vec<Match>, DatastoreError> {
        let body = QueryRequest {
            vector,
            top_k,
            filter,
            include_metadata: true,
        };
        let response = self
            .client
            .post(format!("{host}/query"))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp: QueryResponse = check(response).await?.json().await?;
        Ok(resp.matches)
    }

    /// Delete everything, or everything matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index rejects the request.
    pub async fn delete(
        &self,
        host: &str,
        delete_all: bool,
        filter: Option<&Value>,
    ) -> Result<(), DatastoreError> {
        let response = self
            .client
            .post(format!("{host}/vectors/delete"))
            .header("Api-Key", &self.api_key)
            .json(&DeleteRequest { delete_all, filter })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Render a filter in Pinecone's metadata filter language.
///
/// Conditions on the same field share one object, so a date range becomes
/// `{"created_at": {"$gte": a, "$lte": b}}`.
#[must_use]
pub fn pinecone_filter(filter: &VectorFilter) -> Value {
    let mut out = Map::new();
    for cond in &filter.must {
        let (op, value) = match &cond.op {
            Condition::Eq(FieldValue::Integer(i)) => ("$eq", Value::from(*i)),
            Condition::Eq(FieldValue::Text(s)) => ("$eq", Value::from(s.as_str())),
            Condition::Gte(n) => ("$gte", Value::from(*n)),
            Condition::Lte(n) => ("$lte", Value::from(*n)),
            Condition::In(values) => ("$in", Value::from(values.clone())),
        };
        let entry = out
            .entry(cond.field.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(ops) = entry {
            ops.insert(op.to_owned(), value);
        }
    }
    Value::Object(out)
}
