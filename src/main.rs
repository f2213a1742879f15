//! # docstore CLI
//!
//! Store documents in a vector database and query them by meaning.
//!
//! ```bash
//! docstore upsert-file notes.md --source file --author alice
//! docstore query "how are retries configured" --top-k 5 --start-date 2024-01-01
//! docstore delete --id notes
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use docstore_core::bootstrap::{AppBuilder, resolve_config_path};
use docstore_store::{
    DataStore, DeleteRequest, Document, DocumentMetadata, DocumentMetadataFilter, Query, Source,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Pluggable vector document store")]
#[command(version)]
struct Cli {
    /// Path to config file (default: `DOCSTORE_CONFIG` or config/default.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a file and store it as one document
    UpsertFile {
        path: PathBuf,

        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,

        /// Document id; replaces any chunks stored under it
        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        metadata: MetadataArgs,
    },

    /// Store inline text as one document
    UpsertText {
        text: String,

        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        metadata: MetadataArgs,
    },

    /// Run one or more queries
    Query {
        #[arg(required = true)]
        queries: Vec<String>,

        #[arg(short = 'k', long, default_value_t = docstore_store::models::DEFAULT_TOP_K)]
        top_k: usize,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Delete by document id, by filter, or everything
    Delete {
        /// Document ids (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        #[arg(long, conflicts_with = "ids")]
        all: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List registered vector database backends
    Backends,
}

#[derive(Args)]
struct MetadataArgs {
    #[arg(long)]
    source: Option<Source>,
    #[arg(long)]
    source_id: Option<String>,
    #[arg(long)]
    url: Option<String>,
    /// Any common date format; stored as a Unix timestamp
    #[arg(long)]
    created_at: Option<String>,
    #[arg(long)]
    author: Option<String>,
}

impl MetadataArgs {
    fn into_metadata(self) -> Option<DocumentMetadata> {
        let metadata = DocumentMetadata {
            source: self.source,
            source_id: self.source_id,
            url: self.url,
            created_at: self.created_at,
            author: self.author,
        };
        (metadata != DocumentMetadata::default()).then_some(metadata)
    }
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    document_id: Option<String>,
    #[arg(long = "filter-source")]
    source: Option<Source>,
    #[arg(long = "filter-source-id")]
    source_id: Option<String>,
    #[arg(long = "filter-author")]
    author: Option<String>,
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long)]
    end_date: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> Option<DocumentMetadataFilter> {
        let filter = DocumentMetadataFilter {
            document_id: self.document_id,
            source: self.source,
            source_id: self.source_id,
            author: self.author,
            start_date: self.start_date,
            end_date: self.end_date,
        };
        (!filter.is_empty()).then_some(filter)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Backends) {
        return print_json(&json!({ "backends": docstore_store::supported_backends() }));
    }

    let app = AppBuilder::from_env(cli.config.as_deref())
        .await
        .with_context(|| {
            format!(
                "invalid configuration ({})",
                resolve_config_path(cli.config.as_deref()).display()
            )
        })?;

    // Delete embeds nothing and needs no embedding key.
    if let Commands::Delete { ids, all, filter } = cli.command {
        let request = delete_request(ids, all, filter.into_filter())?;
        let success = delete(&app, request).await?;
        return print_json(&json!({ "success": success }));
    }

    let embedder = app.build_embedder()?;
    let store = app.build_datastore().await?;
    let pipeline = app.build_pipeline(store, embedder);

    match cli.command {
        Commands::UpsertFile {
            path,
            mime,
            id,
            metadata,
        } => {
            let ids = pipeline
                .ingest_file(&path, mime.as_deref(), id, metadata.into_metadata())
                .await
                .with_context(|| format!("failed to ingest {}", path.display()))?;
            tracing::info!(path = %path.display(), ?ids, "file stored");
            print_json(&json!({ "ids": ids }))
        }
        Commands::UpsertText { text, id, metadata } => {
            let ids = pipeline
                .upsert(vec![Document {
                    id,
                    text,
                    metadata: metadata.into_metadata(),
                }])
                .await?;
            print_json(&json!({ "ids": ids }))
        }
        Commands::Query {
            queries,
            top_k,
            filter,
        } => {
            let filter = filter.into_filter();
            let queries = queries
                .into_iter()
                .map(|text| {
                    let query = Query::new(text).with_top_k(top_k);
                    match &filter {
                        Some(f) => query.with_filter(f.clone()),
                        None => query,
                    }
                })
                .collect();
            let results = pipeline.query(queries).await?;
            print_json(&json!({ "results": results }))
        }
        Commands::Delete { .. } | Commands::Backends => Ok(()),
    }
}

fn delete_request(
    ids: Vec<String>,
    all: bool,
    filter: Option<DocumentMetadataFilter>,
) -> anyhow::Result<DeleteRequest> {
    if !all && ids.is_empty() && filter.is_none() {
        bail!("nothing to delete: pass --id, a filter option, or --all");
    }
    Ok(DeleteRequest {
        ids: (!ids.is_empty()).then_some(ids),
        filter,
        delete_all: all,
    })
}

async fn delete(app: &AppBuilder, request: DeleteRequest) -> anyhow::Result<bool> {
    let store = app.build_datastore().await?;
    Ok(store.delete(request).await?)
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
