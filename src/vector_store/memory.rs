//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{rank, Document, SearchResult, VectorStore};
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
pub struct MemoryVectorStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Document>>> {
        self.documents
            .read()
            .map_err(|e| AalimError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Document>>> {
        self.documents
            .write()
            .map_err(|e| AalimError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert_batch(&self, docs: &[Document]) -> Result<usize> {
        let mut store = self.write()?;
        store.extend(docs.iter().cloned());
        Ok(docs.len())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let docs = self.read()?;
        let candidates = docs.iter().filter(|d| d.collection == collection).cloned();
        Ok(rank(candidates, query_embedding, limit))
    }

    async fn clear(&self, collection: &str) -> Result<usize> {
        let mut docs = self.write()?;
        let initial_len = docs.len();
        docs.retain(|doc| doc.collection != collection);
        Ok(initial_len - docs.len())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let docs = self.read()?;
        Ok(docs.iter().filter(|d| d.collection == collection).count())
    }
}
