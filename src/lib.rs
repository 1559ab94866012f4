//! Aalim - Islamic Q&A over a retrieval-augmented knowledge base
//!
//! A backend that answers questions about Islam from a corpus of lecture
//! transcripts, hadith collections and Quran commentaries.
//!
//! # Overview
//!
//! The pipeline runs in stages, each consuming the previous stage's output:
//! - Scrape channel transcripts into per-video JSON files
//! - Combine transcripts, hadith and tafsir datasets into uniform JSONL records
//! - Chunk, embed and store the records in a vector store
//! - Answer questions over HTTP, with optional per-user chat history
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `scraper` - Channel listing and transcript download
//! - `corpus` - Source record schema and dataset converters
//! - `chunking` - Fixed-window text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `indexer` - Batched chunk, embed and store pipeline
//! - `rag` - Passage retrieval and prompt context
//! - `identity` - ID token verification
//! - `conversation` - Chat history storage
//! - `generation` - Language model backends
//! - `answer` - The per-request answering pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use aalim::answer::{AnswerService, QuestionRequest};
//! use aalim::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let service = AnswerService::from_settings(&settings)?;
//!
//!     let response = service.ask(QuestionRequest::new("What is Zakat?")).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod identity;
pub mod indexer;
pub mod openai;
pub mod rag;
pub mod scraper;
pub mod vector_store;

pub use error::{AalimError, Result};
