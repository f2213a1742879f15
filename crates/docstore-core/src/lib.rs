//! Configuration loading, secret resolution, and composition of the
//! embedder, datastore, and ingestion pipeline.

pub mod bootstrap;
pub mod config;
pub mod vault;

pub use config::Config;
