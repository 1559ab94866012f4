//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding;
use crate::rag::Retriever;
use crate::vector_store;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, k: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = vector_store::open(&settings)?;
    let embedder = embedding::from_settings(&settings.embedding)?;
    let retriever = Retriever::new(store, embedder, &settings.vector_store.collection);

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve(query, k).await;
    spinner.finish_and_clear();

    match results {
        Ok(passages) => {
            if passages.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", passages.len()));
                for passage in &passages {
                    Output::passage(
                        &passage.source_label(),
                        &passage.title(),
                        passage.score,
                        &passage.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    println!();
    Output::kv(
        "Entries in collection",
        &retriever.count().await?.to_string(),
    );

    Ok(())
}
