//! Application bootstrap: config resolution, datastore and embedder construction.

use std::path::{Path, PathBuf};

use anyhow::Context;
use docstore_llm::{EmbeddingProvider, GeminiEmbedder};
use docstore_store::document::{IngestionPipeline, TextSplitter};
use docstore_store::{AnyDataStore, create_datastore};

use crate::config::{Config, GEMINI_API_KEY};
use crate::vault::{EnvVaultProvider, VaultProvider};

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Resolve the config path, load it, and resolve secrets from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded or fails validation.
    pub async fn from_env(cli_path: Option<&Path>) -> anyhow::Result<Self> {
        Self::with_vault(cli_path, &EnvVaultProvider).await
    }

    /// Same as [`AppBuilder::from_env`] with an explicit secret source.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded or fails validation.
    pub async fn with_vault(
        cli_path: Option<&Path>,
        vault: &dyn VaultProvider,
    ) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(cli_path);
        let mut config = Config::load(&config_path)?;
        config.resolve_secrets(vault).await?;
        config.validate()?;

        tracing::debug!(
            path = %config_path.display(),
            backend = %config.datastore.backend,
            "configuration loaded"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            config_path: PathBuf::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Connect to the configured vector database.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unknown or the connection fails.
    pub async fn build_datastore(&self) -> anyhow::Result<AnyDataStore> {
        let store_config = self.config.store_config()?;
        create_datastore(&store_config)
            .await
            .with_context(|| format!("failed to initialize {} datastore", store_config.backend))
    }

    /// # Errors
    ///
    /// Returns an error if no Gemini API key was resolved.
    pub fn build_embedder(&self) -> anyhow::Result<GeminiEmbedder> {
        let key = self
            .config
            .secrets
            .gemini_api_key
            .as_ref()
            .with_context(|| format!("{GEMINI_API_KEY} is required for embeddings"))?;
        let embedding = &self.config.embedding;
        Ok(
            GeminiEmbedder::new(key.expose(), embedding.base_url.clone(), &embedding.model)
                .with_max_retries(embedding.max_retries),
        )
    }

    #[must_use]
    pub fn build_splitter(&self) -> TextSplitter {
        TextSplitter::new(self.config.splitter_config())
    }

    pub fn build_pipeline<E: EmbeddingProvider>(
        &self,
        store: AnyDataStore,
        embedder: E,
    ) -> IngestionPipeline<AnyDataStore, E> {
        IngestionPipeline::new(store, embedder, self.build_splitter())
            .with_embed_batch_size(self.config.embedding.batch_size)
            .with_max_file_size(self.config.ingest.max_file_size)
    }
}

/// Priority: CLI `--config` > `DOCSTORE_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("DOCSTORE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use docstore_llm::mock::MockEmbedder;
    use docstore_store::{DataStore, DeleteRequest, Document, Query};
    use serial_test::serial;

    use super::*;
    use crate::config::PINECONE_API_KEY;
    use crate::vault::StaticVaultProvider;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.datastore.backend = "memory".into();
        config
    }

    #[test]
    #[serial]
    fn config_path_priority() {
        unsafe { std::env::remove_var("DOCSTORE_CONFIG") };
        assert_eq!(resolve_config_path(None), PathBuf::from("config/default.toml"));

        unsafe { std::env::set_var("DOCSTORE_CONFIG", "/etc/docstore.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/docstore.toml"));
        assert_eq!(
            resolve_config_path(Some(Path::new("cli.toml"))),
            PathBuf::from("cli.toml")
        );
        unsafe { std::env::remove_var("DOCSTORE_CONFIG") };
    }

    #[tokio::test]
    #[serial]
    async fn with_vault_loads_and_validates() {
        unsafe { std::env::remove_var("DOCSTORE_DATASTORE") };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docstore.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "[datastore]\nbackend = \"memory\"\n").unwrap();

        let app = AppBuilder::with_vault(Some(path.as_path()), &StaticVaultProvider::default())
            .await
            .unwrap();
        assert_eq!(app.config().datastore.backend, "memory");
        assert_eq!(app.config_path(), path.as_path());
    }

    #[tokio::test]
    #[serial]
    async fn with_vault_rejects_incomplete_pinecone_config() {
        unsafe {
            std::env::remove_var("DOCSTORE_DATASTORE");
            std::env::remove_var("DOCSTORE_PINECONE_ENVIRONMENT");
            std::env::remove_var("DOCSTORE_PINECONE_INDEX");
        };
        let dir = tempfile::tempdir().unwrap();
        let vault = StaticVaultProvider::default().with(PINECONE_API_KEY, "k");
        let err = AppBuilder::with_vault(Some(dir.path().join("none.toml").as_path()), &vault)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pinecone.environment"), "{err}");
    }

    #[test]
    fn embedder_requires_key() {
        let app = AppBuilder::from_config(memory_config());
        let err = app.build_embedder().unwrap_err();
        assert!(err.to_string().contains(GEMINI_API_KEY));
    }

    #[tokio::test]
    async fn embedder_uses_configured_model() {
        let mut config = memory_config();
        config.embedding.model = "text-embedding-004".into();
        config
            .resolve_secrets(&StaticVaultProvider::default().with(GEMINI_API_KEY, "g"))
            .await
            .unwrap();
        let embedder = AppBuilder::from_config(config).build_embedder().unwrap();
        assert_eq!(embedder.model(), "models/text-embedding-004");
    }

    #[tokio::test]
    async fn memory_pipeline_round_trip() {
        let mut config = memory_config();
        config.ingest.chunk_size = 64;
        config.ingest.chunk_overlap = 8;
        let app = AppBuilder::from_config(config);
        assert_eq!(app.build_splitter().config().chunk_size, 64);

        let store = app.build_datastore().await.unwrap();
        assert_eq!(store.name(), "memory");
        let pipeline = app.build_pipeline(store, MockEmbedder::with_dimension(16));

        let ids = pipeline
            .upsert(vec![Document {
                id: Some("doc".into()),
                text: "Rust ownership rules keep memory safe.".into(),
                metadata: None,
            }])
            .await
            .unwrap();
        assert_eq!(ids, vec!["doc".to_owned()]);

        let results = pipeline
            .query(vec![Query::new("Rust ownership rules keep memory safe.")])
            .await
            .unwrap();
        assert_eq!(results[0].results[0].metadata.document_id.as_deref(), Some("doc"));

        assert!(pipeline.delete(DeleteRequest::all()).await.unwrap());
    }
}
