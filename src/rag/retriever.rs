//! Top-K passage retrieval.

use super::RetrievedPassage;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Finds the stored passages nearest to a query.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection: String,
}

impl Retriever {
    /// Create a new retriever over `collection`.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        collection: &str,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            collection: collection.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Return at most `k` passages ordered by descending similarity.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self
            .vector_store
            .search(&self.collection, &query_embedding, k)
            .await?;

        debug!("Retrieved {} passages", results.len());
        Ok(results.into_iter().map(RetrievedPassage::from).collect())
    }

    /// Number of entries in the collection.
    pub async fn count(&self) -> Result<usize> {
        self.vector_store.count(&self.collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::LetterEmbedder;
    use crate::vector_store::{Document, MemoryVectorStore};
    use serde_json::json;

    async fn seeded() -> (Retriever, Arc<LetterEmbedder>) {
        let store = Arc::new(MemoryVectorStore::new());
        let texts = ["zakat charity", "fasting ramadan", "prayer salah"];
        let docs: Vec<Document> = texts
            .iter()
            .map(|t| {
                Document::new(
                    "islam_data",
                    t.to_string(),
                    json!({"title": t}).as_object().cloned().unwrap(),
                    LetterEmbedder::vector(t),
                )
            })
            .collect();
        store.insert_batch(&docs).await.unwrap();

        let embedder = Arc::new(LetterEmbedder::default());
        (Retriever::new(store, embedder.clone(), "islam_data"), embedder)
    }

    #[tokio::test]
    async fn test_retrieve_orders_by_similarity() {
        let (retriever, _) = seeded().await;
        let passages = retriever.retrieve("zakat charity", 2).await.unwrap();

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "zakat charity");
        assert!(passages[0].score >= passages[1].score);
        assert_eq!(passages[0].title(), "zakat charity");
    }

    #[tokio::test]
    async fn test_zero_k_is_empty_without_embedding() {
        let (retriever, embedder) = seeded().await;
        assert!(retriever.retrieve("anything", 0).await.unwrap().is_empty());
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_k_larger_than_store() {
        let (retriever, _) = seeded().await;
        let passages = retriever.retrieve("prayer", 50).await.unwrap();
        assert_eq!(passages.len(), 3);
        assert_eq!(retriever.count().await.unwrap(), 3);
    }
}
