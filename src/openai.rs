//! OpenAI-compatible client construction.
//!
//! Embeddings and the optional chat generator talk to any OpenAI-compatible
//! endpoint; `api_base` points them at a local server when set.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with the default timeout. The key comes from `OPENAI_API_KEY`.
pub fn create_client(api_base: Option<&str>) -> Client<OpenAIConfig> {
    create_client_with_timeout(
        api_base,
        None,
        Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    )
}

/// Create an OpenAI client with an explicit key and timeout.
///
/// Falls back to the library's default HTTP client if the builder fails.
pub fn create_client_with_timeout(
    api_base: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base.filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config = config.with_api_key(key);
    }

    let client = Client::with_config(config);
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(http_client) => client.with_http_client(http_client),
        Err(e) => {
            tracing::warn!("Failed to build HTTP client with timeout, using default: {}", e);
            client
        }
    }
}
