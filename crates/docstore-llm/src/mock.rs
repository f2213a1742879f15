//! Test-only deterministic embedding provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;

/// Identical texts always map to identical unit vectors.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    pub dimension: usize,
    /// Calls allowed to succeed before every later call fails.
    pub fail_after: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            dimension: 8,
            fail_after: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_after: Some(0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::default()
        }
    }

    /// Number of `embed` calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for (i, b) in text.bytes().enumerate() {
            v[(usize::from(b) + i) % self.dimension] += 1.0 + (i % 7) as f32;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            v[0] = 1.0;
            return v;
        }
        v.iter_mut().for_each(|x| *x /= norm);
        v
    }
}

impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| previous >= n) {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
