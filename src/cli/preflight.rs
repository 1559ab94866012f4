//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{GenerationProvider, Settings};
use crate::error::{AalimError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Serving and asking need embeddings and a generation key.
    Serve,
    Ask,
    /// Scraping needs yt-dlp.
    Scrape,
    /// Indexing and searching need embeddings.
    Index,
    Search,
    /// Corpus building only touches local files.
    Corpus,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Serve | Operation::Ask => {
            check_embedding_key(settings)?;
            check_generation_key(settings)?;
        }
        Operation::Scrape => {
            check_tool("yt-dlp")?;
        }
        Operation::Index | Operation::Search => {
            check_embedding_key(settings)?;
        }
        Operation::Corpus => {}
    }
    Ok(())
}

fn env_set(name: &str) -> bool {
    std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Embeddings go to api.openai.com unless an `api_base` is configured.
fn check_embedding_key(settings: &Settings) -> Result<()> {
    if settings.embedding.api_base.is_some() || env_set("OPENAI_API_KEY") {
        return Ok(());
    }
    Err(AalimError::Config(
        "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...' \
         or point [embedding] api_base at a local server"
            .to_string(),
    ))
}

fn check_generation_key(settings: &Settings) -> Result<()> {
    let generation = &settings.generation;
    match generation.provider {
        GenerationProvider::Gemini if generation.resolved_api_key().is_none() => {
            Err(AalimError::Config(
                "GEMINI_API_KEY not set. Set it with: export GEMINI_API_KEY='...' \
                 or add api_key to [generation]"
                    .to_string(),
            ))
        }
        GenerationProvider::OpenAI
            if generation.resolved_base_url().is_none() && generation.resolved_api_key().is_none() =>
        {
            Err(AalimError::Config(
                "OPENAI_API_KEY not set for the openai generation provider".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(AalimError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AalimError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(AalimError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
