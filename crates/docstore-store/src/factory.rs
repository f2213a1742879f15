//! Backend selection by name.

use std::future::Future;
use std::pin::Pin;

use crate::any::AnyDataStore;
use crate::datastore::DataStore;
use crate::error::DatastoreError;
use crate::providers::{InMemoryDataStore, PineconeConfig, PineconeDataStore};
use crate::retry::RetryPolicy;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Constructor =
    for<'a> fn(&'a StoreConfig) -> BoxFuture<'a, Result<AnyDataStore, DatastoreError>>;

/// Everything needed to build any registered backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: String,
    pub pinecone: Option<PineconeConfig>,
    pub retry: RetryPolicy,
}

impl StoreConfig {
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: "memory".into(),
            pinecone: None,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn pinecone(config: PineconeConfig, retry: RetryPolicy) -> Self {
        Self {
            backend: "pinecone".into(),
            pinecone: Some(config),
            retry,
        }
    }
}

fn build_pinecone(config: &StoreConfig) -> BoxFuture<'_, Result<AnyDataStore, DatastoreError>> {
    Box::pin(async move {
        let pinecone = config.pinecone.as_ref().ok_or_else(|| {
            DatastoreError::Config("pinecone backend selected without pinecone settings".into())
        })?;
        let store = PineconeDataStore::connect(pinecone, config.retry).await?;
        Ok(AnyDataStore::from(store))
    })
}

fn build_memory(_config: &StoreConfig) -> BoxFuture<'_, Result<AnyDataStore, DatastoreError>> {
    Box::pin(async { Ok(AnyDataStore::from(InMemoryDataStore::new())) })
}

const REGISTRY: &[(&str, Constructor)] = &[
    ("pinecone", build_pinecone as Constructor),
    ("memory", build_memory as Constructor),
];

/// Names accepted by [`create_datastore`].
#[must_use]
pub fn supported_backends() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Check that `name` is a registered backend.
///
/// # Errors
///
/// Returns `UnsupportedBackend` for unknown names.
pub fn validate_backend(name: &str) -> Result<(), DatastoreError> {
    resolve(name).map(|_| ())
}

fn resolve(name: &str) -> Result<Constructor, DatastoreError> {
    let wanted = name.trim().to_ascii_lowercase();
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == wanted)
        .map(|(_, ctor)| *ctor)
        .ok_or_else(|| DatastoreError::UnsupportedBackend {
            requested: name.to_owned(),
            supported: supported_backends(),
        })
}

/// Build the backend named by `config.backend`.
///
/// # Errors
///
/// Returns `UnsupportedBackend` for unknown names, `Config` when the selected
/// backend lacks its settings, or whatever the backend fails with while connecting.
pub async fn create_datastore(config: &StoreConfig) -> Result<AnyDataStore, DatastoreError> {
    let ctor = resolve(&config.backend)?;
    let store = ctor(config).await?;
    tracing::info!(backend = store.name(), "datastore ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_registered_backends() {
        assert_eq!(supported_backends(), vec!["pinecone", "memory"]);
    }

    #[test]
    fn names_are_case_insensitive() {
        assert!(validate_backend("Pinecone").is_ok());
        assert!(validate_backend(" memory ").is_ok());
    }

    #[tokio::test]
    async fn unknown_backend_fails_fast() {
        let config = StoreConfig {
            backend: "weaviate".into(),
            ..StoreConfig::memory()
        };
        let err = create_datastore(&config).await.unwrap_err();
        match err {
            DatastoreError::UnsupportedBackend {
                requested,
                supported,
            } => {
                assert_eq!(requested, "weaviate");
                assert_eq!(supported, vec!["pinecone", "memory"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn pinecone_without_settings_is_config_error() {
        let config = StoreConfig {
            backend: "pinecone".into(),
            ..StoreConfig::memory()
        };
        let err = create_datastore(&config).await.unwrap_err();
        assert!(matches!(err, DatastoreError::Config(_)));
    }

    #[tokio::test]
    async fn builds_memory_store() {
        let store = create_datastore(&StoreConfig::memory()).await.unwrap();
        assert_eq!(store.name(), "memory");
    }
}
