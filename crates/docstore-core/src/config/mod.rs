mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use docstore_store::document::SplitterConfig;
use docstore_store::{PineconeConfig, RetryPolicy, StoreConfig};

use crate::vault::{Secret, VaultProvider};

pub const PINECONE_API_KEY: &str = "DOCSTORE_PINECONE_API_KEY";
pub const GEMINI_API_KEY: &str = "DOCSTORE_GEMINI_API_KEY";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve API keys through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = vault.get_secret(PINECONE_API_KEY).await? {
            self.secrets.pinecone_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret(GEMINI_API_KEY).await? {
            self.secrets.gemini_api_key = Some(Secret::new(val));
        }
        Ok(())
    }

    /// Reject unknown backends and incomplete Pinecone settings.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first problem found.
    pub fn validate(&self) -> anyhow::Result<()> {
        docstore_store::validate_backend(&self.datastore.backend)?;

        if self.is_pinecone() {
            if self.secrets.pinecone_api_key.is_none() {
                bail!("{PINECONE_API_KEY} is required for the pinecone backend");
            }
            if blank(self.pinecone.environment.as_deref()) {
                bail!("pinecone.environment (DOCSTORE_PINECONE_ENVIRONMENT) is required");
            }
            if blank(self.pinecone.index.as_deref()) {
                bail!("pinecone.index (DOCSTORE_PINECONE_INDEX) is required");
            }
            if self.pinecone.dimension == 0 {
                bail!("pinecone.dimension must be positive");
            }
        }
        if self.retry.min_delay_secs > self.retry.max_delay_secs {
            bail!("retry.min_delay_secs must not exceed retry.max_delay_secs");
        }
        Ok(())
    }

    fn is_pinecone(&self) -> bool {
        self.datastore.backend.trim().eq_ignore_ascii_case("pinecone")
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            min_delay: Duration::from_secs(self.retry.min_delay_secs),
            max_delay: Duration::from_secs(self.retry.max_delay_secs),
        }
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.ingest.chunk_size,
            chunk_overlap: self.ingest.chunk_overlap,
            sentence_aware: true,
        }
    }

    /// Settings for [`docstore_store::create_datastore`].
    ///
    /// # Errors
    ///
    /// Returns an error if the pinecone backend is selected without its settings.
    pub fn store_config(&self) -> anyhow::Result<StoreConfig> {
        let pinecone = if self.is_pinecone() {
            let api_key = self
                .secrets
                .pinecone_api_key
                .as_ref()
                .with_context(|| format!("{PINECONE_API_KEY} is not set"))?;
            let environment = self
                .pinecone
                .environment
                .clone()
                .context("pinecone.environment is not set")?;
            let index = self
                .pinecone
                .index
                .clone()
                .context("pinecone.index is not set")?;
            let mut cfg = PineconeConfig::new(api_key.expose(), environment, index);
            cfg.dimension = self.pinecone.dimension;
            cfg.batch_size = self.pinecone.batch_size;
            cfg.controller_url.clone_from(&self.pinecone.controller_url);
            Some(cfg)
        } else {
            None
        };

        Ok(StoreConfig {
            backend: self.datastore.backend.trim().to_ascii_lowercase(),
            pinecone,
            retry: self.retry_policy(),
        })
    }
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
