//! Index command implementation.

use crate::chunking::TextSplitter;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::read_jsonl;
use crate::embedding;
use crate::indexer::Indexer;
use crate::vector_store;
use anyhow::Result;
use std::path::PathBuf;

/// Run the index command.
pub async fn run_index(
    inputs: &[PathBuf],
    chunk_size: Option<usize>,
    overlap: Option<usize>,
    batch_size: Option<usize>,
    clear: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let splitter = TextSplitter::new(
        chunk_size.unwrap_or(settings.indexing.chunk_size),
        overlap.unwrap_or(settings.indexing.chunk_overlap),
    )?;
    Output::info(&format!(
        "Chunking at {} characters with {} overlap",
        splitter.chunk_size(),
        splitter.overlap()
    ));

    let mut records = Vec::new();
    for input in inputs {
        let loaded = read_jsonl(input)?;
        Output::info(&format!("Loaded {} records from {}", loaded.len(), input.display()));
        records.extend(loaded);
    }

    let store = vector_store::open(&settings)?;
    let embedder = embedding::from_settings(&settings.embedding)?;
    let indexer = Indexer::from_settings(&settings, embedder, store)?
        .with_splitter(splitter)
        .with_batch_size(batch_size.unwrap_or(settings.indexing.batch_size))?;

    if clear {
        let removed = indexer.clear().await?;
        Output::info(&format!("Cleared {} entries from '{}'", removed, indexer.collection()));
    }

    let expected: usize = records
        .iter()
        .map(|r| splitter.expected_chunks(r.text.chars().count()))
        .sum();
    let pb = Output::progress_bar(expected as u64, "Embedding chunks");
    let result = indexer.index_with_progress(&records, &pb).await;
    pb.finish_and_clear();

    let report = result?;
    Output::success(&format!(
        "Indexed {} chunks from {} records into '{}' ({} batches)",
        report.chunks_indexed,
        report.records_indexed,
        indexer.collection(),
        report.batches
    ));
    if report.records_skipped > 0 {
        Output::warning(&format!("Skipped {} records with no text", report.records_skipped));
    }

    Ok(())
}
