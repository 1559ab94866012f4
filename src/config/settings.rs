//! Configuration settings for Aalim.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub indexing: IndexingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub identity: IdentitySettings,
    pub conversations: ConversationSettings,
    pub scraper: ScraperSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.aalim".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Base URL of an OpenAI-compatible embeddings endpoint (None = api.openai.com).
    pub api_base: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            api_base: None,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Collection name entries are written to and read from.
    pub collection: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.aalim/vectors.db".to_string(),
            collection: "islam_data".to_string(),
        }
    }
}

/// Indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Number of chunks embedded and stored per batch.
    pub batch_size: usize,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            batch_size: 512,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of passages retrieved when the request does not say.
    pub default_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_k: 5 }
    }
}

/// Generation provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Hosted generative-language API (default).
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat endpoint, including local servers.
    OpenAI,
}

impl std::str::FromStr for GenerationProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(GenerationProvider::Gemini),
            "openai" | "ollama" => Ok(GenerationProvider::OpenAI),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::Gemini => write!(f, "gemini"),
            GenerationProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: GenerationProvider,
    /// Model name.
    pub model: String,
    /// API base URL. Defaults to the provider's public endpoint.
    pub base_url: Option<String>,
    /// API key. Falls back to GEMINI_API_KEY for the gemini provider.
    pub api_key: Option<String>,
    /// Sampling temperature (openai provider only).
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Gemini,
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

/// Root of the hosted generative-language API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl GenerationSettings {
    /// Configured base URL, or the provider default (None = client library default).
    pub fn resolved_base_url(&self) -> Option<String> {
        non_empty(self.base_url.clone()).or_else(|| match self.provider {
            GenerationProvider::Gemini => Some(GEMINI_BASE_URL.to_string()),
            GenerationProvider::OpenAI => None,
        })
    }

    /// Resolve the API key from config or the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        non_empty(self.api_key.clone()).or_else(|| match self.provider {
            GenerationProvider::Gemini => env_non_empty("GEMINI_API_KEY"),
            GenerationProvider::OpenAI => env_non_empty("OPENAI_API_KEY"),
        })
    }
}

/// Identity verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Identity provider (firebase, none).
    pub provider: String,
    /// Web API key. Falls back to FIREBASE_API_KEY.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            provider: "firebase".to_string(),
            api_key: None,
            base_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl IdentitySettings {
    pub fn resolved_api_key(&self) -> Option<String> {
        non_empty(self.api_key.clone()).or_else(|| env_non_empty("FIREBASE_API_KEY"))
    }
}

/// Conversation persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// Conversation store provider (firestore, memory).
    pub provider: String,
    /// Firestore project id. Falls back to FIREBASE_PROJECT_ID.
    pub project_id: Option<String>,
    pub base_url: String,
    /// Number of user+assistant pairs loaded as prior context.
    pub history_turns: usize,
    pub timeout_secs: u64,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            provider: "firestore".to_string(),
            project_id: None,
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            history_turns: 5,
            timeout_secs: 30,
        }
    }
}

impl ConversationSettings {
    pub fn resolved_project_id(&self) -> Option<String> {
        non_empty(self.project_id.clone()).or_else(|| env_non_empty("FIREBASE_PROJECT_ID"))
    }
}

/// Transcript scraper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Concurrent transcript fetches.
    pub workers: usize,
    /// Attempts per video before it is recorded as failed.
    pub retries: u32,
    /// Delay between attempts in seconds.
    pub retry_delay_secs: u64,
    /// Per-attempt timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Subtitle language to request.
    pub language: String,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            workers: 10,
            retries: 3,
            retry_delay_secs: 2,
            fetch_timeout_secs: 10,
            language: "en".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn env_non_empty(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aalim")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_settings() {
        let settings = Settings::default();
        assert_eq!(settings.indexing.chunk_size, 500);
        assert_eq!(settings.indexing.chunk_overlap, 50);
        assert_eq!(settings.indexing.batch_size, 512);
        assert_eq!(settings.retrieval.default_k, 5);
        assert_eq!(settings.conversations.history_turns, 5);
        assert_eq!(settings.vector_store.collection, "islam_data");
        assert_eq!(settings.server.port, 7860);
        assert_eq!(settings.scraper.workers, 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [generation]
            provider = "openai"
            model = "llama3.2"

            [server]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(settings.generation.provider, GenerationProvider::OpenAI);
        assert_eq!(settings.generation.model, "llama3.2");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.indexing.chunk_size, 500);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.vector_store.provider, "sqlite");
    }

    #[test]
    fn test_configured_api_key_wins() {
        let generation = GenerationSettings {
            api_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(generation.resolved_api_key().as_deref(), Some("from-config"));
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("ollama".parse::<GenerationProvider>().unwrap(), GenerationProvider::OpenAI);
        assert_eq!("Gemini".parse::<GenerationProvider>().unwrap(), GenerationProvider::Gemini);
        assert!("bard".parse::<GenerationProvider>().is_err());
    }

    #[test]
    fn test_base_url_defaults_per_provider() {
        let mut generation = GenerationSettings::default();
        assert_eq!(generation.resolved_base_url().as_deref(), Some(GEMINI_BASE_URL));

        generation.provider = GenerationProvider::OpenAI;
        assert_eq!(generation.resolved_base_url(), None);

        generation.base_url = Some("http://localhost:11434/v1".to_string());
        assert_eq!(
            generation.resolved_base_url().as_deref(),
            Some("http://localhost:11434/v1")
        );
    }
}
