//! Generator for the hosted generative-language API (`generateContent`).

use super::Generator;
use crate::config::{GenerationSettings, GEMINI_BASE_URL};
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl GeminiGenerator {
    pub fn new(base_url: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn from_settings(settings: &GenerationSettings, api_key: String) -> Result<Self> {
        let base_url = settings
            .resolved_base_url()
            .unwrap_or_else(|| GEMINI_BASE_URL.to_string());
        Self::new(
            &base_url,
            &settings.model,
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AalimError::Generation(format!(
                "Generation API returned {}: {}",
                status, text
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AalimError::Generation(format!("Unexpected response body: {}", e)))?;
        let answer = parsed.into_text().ok_or_else(|| {
            AalimError::Generation("Response has no candidate text".to_string())
        })?;

        debug!("Generated {} chars", answer.len());
        Ok(answer)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE: &str = "/models/gemini-2.0-flash:generateContent";

    fn generator(server: &MockServer) -> GeminiGenerator {
        GeminiGenerator::new(
            &server.uri(),
            "gemini-2.0-flash",
            "secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_reads_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE))
            .and(query_param("key", "secret"))
            .and(body_json(json!({
                "contents": [{ "parts": [{ "text": "What is Zakat?" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Zakat is obligatory charity." }], "role": "model" },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let answer = generator(&server).generate("What is Zakat?").await.unwrap();
        assert_eq!(answer, "Zakat is obligatory charity.");
    }

    #[tokio::test]
    async fn test_upstream_error_is_not_an_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let err = generator(&server).generate("q").await.unwrap_err();
        assert!(matches!(err, AalimError::Generation(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_missing_candidates_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = generator(&server).generate("q").await.unwrap_err();
        assert!(matches!(err, AalimError::Generation(_)));
    }

    #[tokio::test]
    async fn test_empty_parts_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [] } }]
            })))
            .mount(&server)
            .await;

        assert!(generator(&server).generate("q").await.is_err());
    }
}
