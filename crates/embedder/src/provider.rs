use crate::error::Result;
use async_trait::async_trait;

/// Narrow interface to an external text-embedding backend.
///
/// Implementations classify failures through [`crate::EmbedError`] so the
/// engine's retry policy can distinguish transient overload from hard
/// client errors. The vector dimension is not part of the contract; it is
/// probed once by the engine.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, used to namespace cached vectors.
    fn model_id(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order. The default issues one
    /// request per text; backends with a native batch endpoint override.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Liveness probe. Used after repeated overload before retrying.
    async fn health(&self) -> bool;
}

/// Narrow interface to an external text-generation backend (cold path).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier.
    fn model_id(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;

    /// Liveness probe.
    async fn health(&self) -> bool;
}
