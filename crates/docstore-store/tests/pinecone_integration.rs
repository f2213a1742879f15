use std::time::Duration;

use docstore_store::{
    ChunkMap, DataStore, DatastoreError, DeleteRequest, DocumentChunk, DocumentChunkMetadata,
    DocumentMetadataFilter, PineconeConfig, PineconeDataStore, Query, RetryPolicy, Source,
    StoreConfig, create_datastore,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEXED: [&str; 6] = [
    "source",
    "source_id",
    "url",
    "created_at",
    "author",
    "document_id",
];

async fn mount_controller(server: &MockServer, existing: &[&str], creates: u64) {
    Mock::given(method("GET"))
        .and(path("/databases"))
        .and(header("Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(existing))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/databases"))
        .and(body_partial_json(json!({
            "name": "idx",
            "dimension": 768,
            "metadata_config": {"indexed": INDEXED}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(creates)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/databases/idx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "database": {"name": "idx"},
            "status": {"host": server.uri(), "ready": true}
        })))
        .mount(server)
        .await;
}

fn config(server: &MockServer) -> PineconeConfig {
    PineconeConfig::new("test-key", "test-env", "idx").with_controller_url(server.uri())
}

async fn connect(server: &MockServer) -> PineconeDataStore {
    mount_controller(server, &["idx"], 0).await;
    PineconeDataStore::connect(&config(server), RetryPolicy::immediate(3))
        .await
        .unwrap()
}

fn chunk(id: &str, text: &str, embedding: Vec<f32>) -> DocumentChunk {
    DocumentChunk {
        id: id.into(),
        text: text.into(),
        metadata: DocumentChunkMetadata {
            source: Some(Source::File),
            ..Default::default()
        },
        embedding: Some(embedding),
    }
}

async fn request_bodies(server: &MockServer, endpoint: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == endpoint)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn connect_creates_missing_index() {
    let server = MockServer::start().await;
    mount_controller(&server, &["other"], 1).await;

    let store = PineconeDataStore::connect(&config(&server), RetryPolicy::immediate(3))
        .await
        .unwrap();
    assert_eq!(store.host(), server.uri());
    assert_eq!(store.index(), "idx");
}

#[tokio::test]
async fn connect_attaches_to_existing_index() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    assert_eq!(store.name(), "pinecone");
}

#[tokio::test]
async fn connect_without_host_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(["idx"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/databases/idx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": {"ready": false}})))
        .mount(&server)
        .await;

    let err = PineconeDataStore::connect(&config(&server), RetryPolicy::immediate(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::Config(_)));
}

#[tokio::test]
async fn connect_failure_is_propagated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/databases"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = PineconeDataStore::connect(&config(&server), RetryPolicy::immediate(3))
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::Backend { status: 401, .. }));
}

#[tokio::test]
async fn upsert_then_query_example() {
    let server = MockServer::start().await;
    let store = connect(&server).await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"topK": 1, "includeMetadata": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{
                "id": "c1",
                "score": 0.99,
                "metadata": {"text": "hello", "source": "file", "document_id": "doc1"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut chunks = ChunkMap::new();
    chunks.insert("doc1".into(), vec![chunk("c1", "hello", vec![0.1, 0.2])]);
    let ids = store.upsert(chunks).await.unwrap();
    assert_eq!(ids, vec!["doc1".to_owned()]);

    let upserts = request_bodies(&server, "/vectors/upsert").await;
    let vector = &upserts[0]["vectors"][0];
    assert_eq!(vector["id"], "c1");
    assert_eq!(vector["metadata"]["text"], "hello");
    assert_eq!(vector["metadata"]["document_id"], "doc1");
    assert_eq!(vector["metadata"]["source"], "file");

    let results = store
        .query(vec![Query::new("hello").with_top_k(1).with_embedding(vec![0.1, 0.2])])
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].query, "hello");
    let hit = &results[0].results[0];
    assert_eq!(hit.id, "c1");
    assert_eq!(hit.text, "hello");
    assert_eq!(hit.metadata.source, Some(Source::File));
}

#[tokio::test]
async fn upsert_sends_batches_of_five_in_order() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 5})))
        .expect(3)
        .mount(&server)
        .await;

    let mut chunks = ChunkMap::new();
    chunks.insert(
        "a".into(),
        (0..7).map(|i| chunk(&format!("a_{i}"), "t", vec![1.0])).collect(),
    );
    chunks.insert(
        "b".into(),
        (0..5).map(|i| chunk(&format!("b_{i}"), "t", vec![1.0])).collect(),
    );
    let ids = store.upsert(chunks).await.unwrap();
    assert_eq!(ids, vec!["a".to_owned(), "b".to_owned()]);

    let bodies = request_bodies(&server, "/vectors/upsert").await;
    let sizes: Vec<usize> = bodies
        .iter()
        .map(|b| b["vectors"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(bodies[0]["vectors"][0]["id"], "a_0");
    assert_eq!(bodies[1]["vectors"][1]["id"], "a_6");
    assert_eq!(bodies[2]["vectors"][1]["id"], "b_4");
}

#[tokio::test]
async fn upsert_rejects_missing_embedding_before_any_request() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut chunks = ChunkMap::new();
    let mut bad = chunk("c1", "hello", vec![]);
    bad.embedding = None;
    chunks.insert("doc1".into(), vec![bad]);

    let err = store.upsert(chunks).await.unwrap_err();
    assert!(matches!(err, DatastoreError::MissingEmbedding { chunk_id } if chunk_id == "c1"));
}

#[tokio::test]
async fn transient_upsert_failure_is_retried() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut chunks = ChunkMap::new();
    chunks.insert("d".into(), vec![chunk("d_0", "t", vec![1.0])]);
    assert!(store.upsert(chunks).await.is_ok());
}

#[tokio::test]
async fn query_results_keep_input_order() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"vector": [1.0, 0.0]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"matches": [{"id": "first", "score": 1.0, "metadata": {"text": "one"}}]}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"vector": [0.0, 1.0]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"matches": [{"id": "second", "score": 1.0, "metadata": {"text": "two"}}]}),
        ))
        .mount(&server)
        .await;

    let results = store
        .query(vec![
            Query::new("q1").with_embedding(vec![1.0, 0.0]),
            Query::new("q2").with_embedding(vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

    assert_eq!(results[0].query, "q1");
    assert_eq!(results[0].results[0].id, "first");
    assert_eq!(results[1].query, "q2");
    assert_eq!(results[1].results[0].id, "second");
}

#[tokio::test]
async fn query_filter_uses_start_date_lower_bound_only() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "topK": 3,
            "filter": {"created_at": {"$gte": 1_609_459_200}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    let q = Query::new("q")
        .with_filter(DocumentMetadataFilter {
            start_date: Some("2021-01-01".into()),
            ..Default::default()
        })
        .with_embedding(vec![1.0]);
    let results = store.query(vec![q]).await.unwrap();
    assert!(results[0].results.is_empty());

    let bodies = request_bodies(&server, "/query").await;
    assert!(bodies[0]["filter"]["created_at"].get("$lte").is_none());
}

#[tokio::test]
async fn query_omits_empty_filter_and_normalizes_hits() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{
                "id": "x",
                "score": 0.5,
                "metadata": {"text": "body", "source": "fax", "created_at": 1_609_459_200}
            }]
        })))
        .mount(&server)
        .await;

    let q = Query::new("q")
        .with_filter(DocumentMetadataFilter::default())
        .with_embedding(vec![1.0]);
    let results = store.query(vec![q]).await.unwrap();
    let hit = &results[0].results[0];
    assert_eq!(hit.text, "body");
    assert!(hit.metadata.source.is_none());
    assert_eq!(
        hit.metadata.created_at.as_deref(),
        Some("2021-01-01T00:00:00+00:00")
    );

    let bodies = request_bodies(&server, "/query").await;
    assert!(bodies[0].get("filter").is_none());
}

#[tokio::test]
async fn query_failure_after_retries() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = store
        .query(vec![Query::new("q").with_embedding(vec![1.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::Backend { status: 503, .. }));
}

#[tokio::test]
async fn delete_all_ignores_other_arguments() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/vectors/delete"))
        .and(body_json(json!({"deleteAll": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let req = DeleteRequest {
        ids: Some(vec!["a".into()]),
        filter: Some(DocumentMetadataFilter {
            author: Some("ann".into()),
            ..Default::default()
        }),
        delete_all: true,
    };
    assert!(store.delete(req).await.unwrap());
    assert_eq!(request_bodies(&server, "/vectors/delete").await.len(), 1);
}

#[tokio::test]
async fn delete_by_ids_targets_document_id() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/vectors/delete"))
        .and(body_json(json!({"filter": {"document_id": {"$in": ["a", "b"]}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(store.delete(DeleteRequest::by_ids(["a", "b"])).await.unwrap());
}

#[tokio::test]
async fn delete_by_filter_and_ids_issues_both() {
    let server = MockServer::start().await;
    let store = connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/vectors/delete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let req = DeleteRequest {
        ids: Some(vec!["a".into()]),
        filter: Some(DocumentMetadataFilter {
            source: Some(Source::Chat),
            ..Default::default()
        }),
        delete_all: false,
    };
    store.delete(req).await.unwrap();

    let bodies = request_bodies(&server, "/vectors/delete").await;
    assert_eq!(bodies[0], json!({"filter": {"source": {"$eq": "chat"}}}));
    assert_eq!(bodies[1], json!({"filter": {"document_id": {"$in": ["a"]}}}));
}

#[tokio::test]
async fn factory_builds_pinecone_store() {
    let server = MockServer::start().await;
    mount_controller(&server, &["idx"], 0).await;

    let store = create_datastore(&StoreConfig::pinecone(
        config(&server),
        RetryPolicy::immediate(1),
    ))
    .await
    .unwrap();
    assert_eq!(store.name(), "pinecone");
}
