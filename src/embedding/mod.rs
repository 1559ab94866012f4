//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Create the embedder named by `[embedding].provider`.
pub fn from_settings(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIEmbedder::from_settings(settings))),
        other => Err(AalimError::Config(format!("Unknown embedding provider: {}", other))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_uses_configured_dimensions() {
        let settings = EmbeddingSettings {
            dimensions: 256,
            ..EmbeddingSettings::default()
        };
        assert_eq!(from_settings(&settings).unwrap().dimensions(), 256);
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let settings = EmbeddingSettings {
            provider: "word2vec".to_string(),
            ..EmbeddingSettings::default()
        };
        assert!(matches!(from_settings(&settings), Err(AalimError::Config(_))));
    }
}
