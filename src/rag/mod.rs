//! Retrieval for question answering.
//!
//! Embeds a query, finds the nearest stored passages and formats them for the
//! answer prompt.

pub mod context;
mod retriever;

pub use context::format_passages_for_prompt;
pub use retriever::Retriever;

use crate::vector_store::{metadata_text, Metadata, SearchResult};
use serde::Serialize;

/// A stored passage returned for a query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedPassage {
    /// Chunk text.
    pub content: String,
    /// Metadata of the source record the chunk came from.
    pub metadata: Metadata,
    /// Similarity score (higher is better).
    pub score: f32,
}

impl RetrievedPassage {
    /// Source label: hadith collection, tafsir name, then source type.
    pub fn source_label(&self) -> String {
        ["source", "tafsir_name", "source_type"]
            .iter()
            .find_map(|key| metadata_text(&self.metadata, key))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Title of the parent record.
    pub fn title(&self) -> String {
        metadata_text(&self.metadata, "title").unwrap_or_else(|| "unknown".to_string())
    }
}

impl From<SearchResult> for RetrievedPassage {
    fn from(result: SearchResult) -> Self {
        Self {
            content: result.document.content,
            metadata: result.document.metadata,
            score: result.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn passage(metadata: serde_json::Value) -> RetrievedPassage {
        RetrievedPassage {
            content: "text".to_string(),
            metadata: metadata.as_object().cloned().unwrap(),
            score: 0.5,
        }
    }

    #[test]
    fn test_source_label_fallbacks() {
        assert_eq!(
            passage(json!({"source": "Sahih Muslim", "source_type": "hadith"})).source_label(),
            "Sahih Muslim"
        );
        assert_eq!(
            passage(json!({"tafsir_name": "Jalalayn", "source_type": "tafsir"})).source_label(),
            "Jalalayn"
        );
        assert_eq!(passage(json!({"source_type": "video"})).source_label(), "video");
        assert_eq!(passage(json!({})).source_label(), "unknown");
    }

    #[test]
    fn test_title_fallback() {
        assert_eq!(passage(json!({"title": "On Prayer"})).title(), "On Prayer");
        assert_eq!(passage(json!({"title": null})).title(), "unknown");
    }
}
