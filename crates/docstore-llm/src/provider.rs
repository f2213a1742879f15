use std::future::Future;

use crate::error::LlmError;

/// Produces fixed-length float vectors for input texts.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed every text in `texts`, returning one vector per input in the same order.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails or returns a malformed response.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    fn name(&self) -> &'static str;
}
