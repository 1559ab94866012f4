//! Generator for OpenAI-compatible chat endpoints, including local model servers.

use super::Generator;
use crate::config::GenerationSettings;
use crate::error::{AalimError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    pub fn new(client: Client<OpenAIConfig>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn from_settings(settings: &GenerationSettings) -> Self {
        let client = create_client_with_timeout(
            settings.resolved_base_url().as_deref(),
            settings.resolved_api_key().as_deref(),
            Duration::from_secs(settings.timeout_secs),
        );
        Self::new(client, &settings.model, settings.temperature)
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AalimError::Generation(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(|e| AalimError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AalimError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AalimError::Generation("Empty response from model".to_string()))?;

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
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_against_compatible_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "llama3.2",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Salah is the ritual prayer." },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let client = create_client_with_timeout(
            Some(&format!("{}/v1", server.uri())),
            Some("local"),
            Duration::from_secs(5),
        );
        let generator = OpenAIGenerator::new(client, "llama3.2", 0.3);
        assert_eq!(
            generator.generate("What is Salah?").await.unwrap(),
            "Salah is the ritual prayer."
        );
    }
}
