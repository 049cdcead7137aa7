//! OpenAI-compatible embeddings provider implementing [`Embedder`] (spec §6
//! "Embedding HTTP"): `POST {baseUrl}/embeddings`, one fixed-length vector per
//! input. Dimension is detected by embedding the string `"test"` on first use
//! rather than hardcoded per model, since a provider may point at any
//! OpenAI-compatible embeddings endpoint.

use std::sync::OnceLock;

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::memory::Embedder;

/// OpenAI-compatible embeddings client. Default model is `text-embedding-3-small`.
///
/// # Examples
///
/// ```ignore
/// use shuttle::memory::OpenAIEmbedder;
///
/// let embedder = OpenAIEmbedder::new("text-embedding-3-small");
/// let vectors = embedder.embed(&["Hello, world!"]).await?;
/// ```
pub struct OpenAIEmbedder {
    config: OpenAIConfig,
    model: String,
    /// Lazily detected by embedding `"test"` on first use (spec §6).
    detected_dimension: OnceLock<usize>,
    detect_lock: Mutex<()>,
}

impl OpenAIEmbedder {
    /// Creates a new embedder with the specified model. The API key is read
    /// from `OPENAI_API_KEY` (or whatever `config` carries).
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), model)
    }

    /// Creates a new embedder pointed at a custom `OpenAIConfig` (alternate
    /// `base_url`/`api_key`, e.g. a provider's own embeddings endpoint).
    ///
    /// ```ignore
    /// use async_openai::config::OpenAIConfig;
    /// use shuttle::memory::OpenAIEmbedder;
    ///
    /// let config = OpenAIConfig::new().with_api_key("sk-...");
    /// let embedder = OpenAIEmbedder::with_config(config, "text-embedding-3-small");
    /// ```
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            config,
            model: model.into(),
            detected_dimension: OnceLock::new(),
            detect_lock: Mutex::new(()),
        }
    }

    async fn request(&self, input: EmbeddingInput) -> Result<Vec<Vec<f32>>, StoreError> {
        let client = Client::with_config(self.config.clone());
        let request = CreateEmbeddingRequest {
            input,
            model: self.model.clone(),
            ..Default::default()
        };
        let response = client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| StoreError::Embedding(format!("OpenAI-compatible API error: {e}")))?;
        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }

    async fn ensure_dimension_detected(&self) -> Result<usize, StoreError> {
        if let Some(dim) = self.detected_dimension.get() {
            return Ok(*dim);
        }
        let _guard = self.detect_lock.lock().await;
        if let Some(dim) = self.detected_dimension.get() {
            return Ok(*dim);
        }
        let probe = self.request(EmbeddingInput::String("test".to_string())).await?;
        let dim = probe
            .first()
            .map(|v| v.len())
            .ok_or_else(|| StoreError::Embedding("empty embeddings response during dimension probe".to_string()))?;
        let _ = self.detected_dimension.set(dim);
        Ok(dim)
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        self.ensure_dimension_detected().await?;
        let inputs: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();
        let input = if inputs.len() == 1 {
            EmbeddingInput::String(inputs[0].clone())
        } else {
            EmbeddingInput::StringArray(inputs)
        };
        self.request(input).await
    }

    fn dimension(&self) -> usize {
        self.detected_dimension.get().copied().unwrap_or(1536)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_before_first_use_falls_back_to_a_common_default() {
        let embedder = OpenAIEmbedder::new("text-embedding-3-small");
        assert_eq!(embedder.dimension(), 1536);
    }

    #[tokio::test]
    #[ignore = "requires a live OpenAI-compatible endpoint"]
    async fn test_openai_embed() {
        std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set for this test");
        let embedder = OpenAIEmbedder::new("text-embedding-3-small");
        let vectors = embedder.embed(&["Hello, world!", "The quick brown fox"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(embedder.dimension(), vectors[0].len());
    }
}
