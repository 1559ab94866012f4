//! Vector store abstraction for Aalim.
//!
//! Provides a trait-based interface for different vector database backends.
//! Entries live in named collections and are never updated in place.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::Settings;
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Metadata attached to an indexed entry.
pub type Metadata = Map<String, Value>;

/// A document stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Collection this document belongs to.
    pub collection: String,
    /// Text content of this chunk.
    pub content: String,
    /// Metadata copied from the source record.
    pub metadata: Metadata,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document.
    pub fn new(collection: &str, content: String, metadata: Metadata, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection: collection.to_string(),
            content,
            metadata,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// Render a metadata value as text. Null and empty strings count as missing.
pub fn metadata_text(metadata: &Metadata, key: &str) -> Option<String> {
    match metadata.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert documents. Returns the number inserted.
    async fn insert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// Return up to `limit` documents of `collection`, most similar first.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Delete every document in a collection. Returns the number removed.
    async fn clear(&self, collection: &str) -> Result<usize>;

    /// Number of documents in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Open the vector store selected by `[vector_store] provider`.
pub fn open(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(AalimError::Config(format!("Unknown vector store provider: {}", other))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score, sort descending and truncate. Shared by the store implementations.
pub(crate) fn rank(
    docs: impl Iterator<Item = Document>,
    query_embedding: &[f32],
    limit: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = docs
        .map(|doc| {
            let score = cosine_similarity(query_embedding, &doc.embedding);
            SearchResult { document: doc, score }
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_metadata_text() {
        let metadata = json!({
            "title": "Book of Zakat",
            "hadith_no": 12,
            "source": null,
            "empty": " "
        });
        let metadata = metadata.as_object().unwrap();

        assert_eq!(metadata_text(metadata, "title").as_deref(), Some("Book of Zakat"));
        assert_eq!(metadata_text(metadata, "hadith_no").as_deref(), Some("12"));
        assert_eq!(metadata_text(metadata, "source"), None);
        assert_eq!(metadata_text(metadata, "empty"), None);
        assert_eq!(metadata_text(metadata, "absent"), None);
    }
}
