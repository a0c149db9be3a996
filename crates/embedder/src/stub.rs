use crate::error::Result;
use crate::provider::{EmbeddingProvider, LlmProvider};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic offline provider for tests and air-gapped runs.
///
/// Vectors are derived from a hash of the input text, so equal texts get
/// equal vectors and different texts almost always differ. Call counts are
/// exposed for assertions about caching and dedup behavior.
pub struct StubProvider {
    dimension: usize,
    embed_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl StubProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            embed_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls made against this provider.
    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Number of `generate` calls made against this provider.
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut vector = Vec::with_capacity(self.dimension);
        let mut state = seed | 1;
        for _ in 0..self.dimension {
            // Cheap xorshift keeps components varied and reproducible.
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            vector.push(((state % 2000) as f32 - 1000.0) / 1000.0);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    fn model_id(&self) -> &str {
        "stub"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }

    async fn health(&self) -> bool {
        true
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn model_id(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str, max_tokens: u32, _temperature: f32) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let mut summary = format!("Summary of {} chars of input", prompt.len());
        summary.truncate(max_tokens as usize);
        Ok(summary)
    }

    async fn health(&self) -> bool {
        true
    }
}
