//! CLI module for Aalim.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aalim - Islamic Q&A over a retrieval-augmented knowledge base
///
/// Scrape and combine a corpus of lecture transcripts, hadith and tafsir,
/// index it into a vector store, and answer questions over HTTP.
#[derive(Parser, Debug)]
#[command(name = "aalim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server (POST /ask)
    Serve {
        /// Host to bind to (default: [server] host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default: [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Download transcripts for every video on a channel
    Scrape {
        /// Channel URL, e.g. https://www.youtube.com/@channel
        channel_url: String,

        /// Directory receiving one <video_id>.json per video
        #[arg(short, long, default_value = "transcripts")]
        output_dir: PathBuf,

        /// File that failed videos are appended to
        #[arg(long, default_value = "failed_ids.txt")]
        failed_log: PathBuf,

        /// Concurrent fetches (default: [scraper] workers)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Only consider the newest N videos
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Build uniform JSONL corpus files from raw datasets
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Chunk, embed and store JSONL corpus files
    Index {
        /// JSONL files produced by `aalim corpus`
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Chunk size in characters (default: [indexing] chunk_size)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between chunks in characters (default: [indexing] chunk_overlap)
        #[arg(long)]
        overlap: Option<usize>,

        /// Chunks per embed+store batch (default: [indexing] batch_size)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Delete the collection's entries before indexing
        #[arg(long)]
        clear: bool,
    },

    /// Search the knowledge base
    Search {
        /// Search query
        query: String,

        /// Number of passages to return
        #[arg(short, long, default_value = "5")]
        k: usize,
    },

    /// Ask a single question as a guest
    Ask {
        /// The question to ask
        question: String,

        /// Number of passages used as context
        #[arg(short, long, default_value = "5")]
        k: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CorpusAction {
    /// Combine scraped transcript files into video records
    Transcripts {
        /// Directory of <video_id>.json files
        dir: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert a hadith CSV into hadith records
    Hadith {
        /// CSV with text_en, chapter, hadith_id, source, chapter_no, hadith_no columns
        csv: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert tafsir CSVs into tafsir records
    Tafsir {
        /// Directory holding the default tafsir CSV files
        dir: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Explicit NAME=FILE source, repeatable. Replaces the defaults.
        #[arg(long = "source", value_parser = parse_source)]
        sources: Vec<(String, PathBuf)>,
    },

    /// Drop lines that are not valid JSON
    Clean {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Parse a `NAME=FILE` tafsir source.
fn parse_source(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, file)) if !name.trim().is_empty() && !file.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(file.trim())))
        }
        _ => Err(format!("expected NAME=FILE, got {:?}", s)),
    }
}
