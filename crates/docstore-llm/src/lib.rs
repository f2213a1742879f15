//! Embedding provider abstraction and the Gemini embedding backend.

pub mod error;
pub mod gemini;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod provider;
pub(crate) mod retry;

pub use error::LlmError;
pub use gemini::GeminiEmbedder;
pub use provider::EmbeddingProvider;
