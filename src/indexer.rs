//! Indexing pipeline: split records, embed in batches, store.

use crate::chunking::TextSplitter;
use crate::config::Settings;
use crate::corpus::SourceRecord;
use crate::embedding::Embedder;
use crate::error::{AalimError, Result};
use crate::vector_store::{Document, Metadata, VectorStore};
use indicatif::ProgressBar;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default number of chunks embedded and stored together.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// A chunk waiting to be embedded.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub text: String,
    pub metadata: Metadata,
}

/// Result of an indexing run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    /// Records that produced at least one chunk.
    pub records_indexed: usize,
    /// Records skipped for having no text.
    pub records_skipped: usize,
    /// Entries written to the store.
    pub chunks_indexed: usize,
    /// Embed+store batches submitted.
    pub batches: usize,
}

/// Splits source records into chunks and writes them to a vector store collection.
///
/// There is no dedup key: indexing the same records twice stores them twice
/// unless the collection is cleared first.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    splitter: TextSplitter,
    batch_size: usize,
}

impl Indexer {
    /// Create an indexer with the default splitter (500/50) and batch size.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        collection: &str,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            collection: collection.to_string(),
            splitter: TextSplitter::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Create an indexer from the `[indexing]` and `[vector_store]` config sections.
    pub fn from_settings(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(
            settings.indexing.chunk_size,
            settings.indexing.chunk_overlap,
        )?;
        Self::new(embedder, vector_store, &settings.vector_store.collection)
            .with_splitter(splitter)
            .with_batch_size(settings.indexing.batch_size)
    }

    /// Set the text splitter.
    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Set the batch size. Must be non-zero.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(AalimError::Config("batch_size must be greater than zero".to_string()));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Delete every entry in the target collection.
    pub async fn clear(&self) -> Result<usize> {
        self.vector_store.clear(&self.collection).await
    }

    /// Split records into chunks carrying their parent's metadata plus `chunk_id`.
    ///
    /// Returns the chunks and the number of records skipped for empty text.
    pub fn chunk_records(&self, records: &[SourceRecord]) -> (Vec<PendingChunk>, usize) {
        let mut pending = Vec::new();
        let mut skipped = 0;

        for record in records {
            if record.text.trim().is_empty() {
                skipped += 1;
                continue;
            }

            let metadata = record.metadata();
            for chunk in self.splitter.split(&record.text) {
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunk_id".to_string(), Value::from(chunk.index));
                pending.push(PendingChunk {
                    text: chunk.text,
                    metadata: chunk_metadata,
                });
            }
        }

        (pending, skipped)
    }

    /// Index records.
    pub async fn index(&self, records: &[SourceRecord]) -> Result<IndexReport> {
        self.run(records, None).await
    }

    /// Index records, advancing `progress` by one per stored chunk.
    pub async fn index_with_progress(
        &self,
        records: &[SourceRecord],
        progress: &ProgressBar,
    ) -> Result<IndexReport> {
        self.run(records, Some(progress)).await
    }

    #[instrument(skip(self, records, progress), fields(records = records.len(), collection = %self.collection))]
    async fn run(&self, records: &[SourceRecord], progress: Option<&ProgressBar>) -> Result<IndexReport> {
        let (pending, records_skipped) = self.chunk_records(records);
        let mut report = IndexReport {
            records_indexed: records.len() - records_skipped,
            records_skipped,
            ..Default::default()
        };

        info!(
            "Indexing {} chunks from {} records into '{}'",
            pending.len(),
            report.records_indexed,
            self.collection
        );

        if let Some(pb) = progress {
            pb.set_length(pending.len() as u64);
        }

        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(AalimError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let documents: Vec<Document> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    Document::new(
                        &self.collection,
                        chunk.text.clone(),
                        chunk.metadata.clone(),
                        embedding,
                    )
                })
                .collect();

            report.chunks_indexed += self.vector_store.insert_batch(&documents).await?;
            report.batches += 1;
            debug!("Stored batch {} ({} chunks)", report.batches, documents.len());

            if let Some(pb) = progress {
                pb.inc(documents.len() as u64);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SourceType;
    use crate::embedding::testing::LetterEmbedder;
    use crate::vector_store::MemoryVectorStore;

    fn video(id: &str, text: &str) -> SourceRecord {
        let mut record = SourceRecord::new(SourceType::Video, "Lecture", text);
        record.video_id = Some(id.to_string());
        record
    }

    fn indexer(embedder: Arc<LetterEmbedder>, store: Arc<MemoryVectorStore>) -> Indexer {
        Indexer::new(embedder, store, "islam_data")
            .with_splitter(TextSplitter::new(10, 2).unwrap())
            .with_batch_size(3)
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_batches_and_skips_empty_records() {
        let embedder = Arc::new(LetterEmbedder::default());
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(embedder.clone(), store.clone());

        // 26 chars with size 10 / overlap 2 -> ceil(24 / 8) = 3 chunks each.
        let records = vec![
            video("a", "abcdefghijklmnopqrstuvwxyz"),
            video("b", "   "),
            video("c", "zyxwvutsrqponmlkjihgfedcba"),
        ];

        let report = indexer.index(&records).await.unwrap();
        assert_eq!(
            report,
            IndexReport {
                records_indexed: 2,
                records_skipped: 1,
                chunks_indexed: 6,
                batches: 2,
            }
        );
        assert_eq!(embedder.call_count(), 2);
        assert_eq!(store.count("islam_data").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_chunks_carry_parent_metadata() {
        let indexer = indexer(
            Arc::new(LetterEmbedder::default()),
            Arc::new(MemoryVectorStore::new()),
        );

        let (pending, skipped) = indexer.chunk_records(&[video("abc", "abcdefghijklmnop")]);
        assert_eq!(skipped, 0);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].metadata["video_id"], "abc");
        assert_eq!(pending[1].metadata["source_type"], "video");
        assert_eq!(pending[1].metadata["chunk_id"], 1);
        assert_eq!(pending[1].text, "ijklmnop");
    }

    #[tokio::test]
    async fn test_reindexing_without_clear_duplicates_entries() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(Arc::new(LetterEmbedder::default()), store.clone());
        let records = vec![video("a", "abcdefghijklmnopqrstuvwxyz")];

        indexer.index(&records).await.unwrap();
        indexer.index(&records).await.unwrap();
        assert_eq!(store.count("islam_data").await.unwrap(), 6);

        indexer.clear().await.unwrap();
        indexer.index(&records).await.unwrap();
        assert_eq!(store.count("islam_data").await.unwrap(), 3);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = Indexer::new(
            Arc::new(LetterEmbedder::default()),
            Arc::new(MemoryVectorStore::new()),
            "c",
        )
        .with_batch_size(0);
        assert!(result.is_err());
    }
}
