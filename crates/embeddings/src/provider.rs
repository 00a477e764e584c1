use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};

/// External embedding service seam.
///
/// Implementations own transport, authentication and error
/// classification; the pipeline only sees the typed
/// [`EmbeddingError`](crate::EmbeddingError) taxonomy.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}

/// Deterministic in-process provider for tests and offline runs.
///
/// Vectors are a byte histogram of the input, so identical texts map
/// to identical vectors and related texts overlap. The call counter
/// lets tests assert cache-hit behavior.
pub struct StubEmbeddingProvider {
    dimension: usize,
    calls: AtomicUsize,
}

impl StubEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return vector;
        }
        for (i, byte) in text.bytes().enumerate() {
            let slot = (byte as usize + i) % self.dimension;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
