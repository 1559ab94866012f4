//! Answer generation from an assembled prompt.

mod gemini;
mod openai;

pub use gemini::GeminiGenerator;
pub use openai::OpenAIGenerator;

use crate::config::{GenerationProvider, Settings};
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A language model that turns a prompt into answer text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`. No retries.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Build the generator selected by `[generation] provider`.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn Generator>> {
    let config = &settings.generation;
    match config.provider {
        GenerationProvider::Gemini => {
            let api_key = config.resolved_api_key().ok_or_else(|| {
                AalimError::Config(
                    "No generation API key. Set GEMINI_API_KEY or [generation] api_key".to_string(),
                )
            })?;
            Ok(Arc::new(GeminiGenerator::from_settings(config, api_key)?))
        }
        GenerationProvider::OpenAI => Ok(Arc::new(OpenAIGenerator::from_settings(config))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted generators for service tests.

    use super::Generator;
    use crate::error::{AalimError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every prompt and answers with a fixed prefix plus a counter.
    #[derive(Default)]
    pub struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl RecordingGenerator {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            if self.fail {
                return Err(AalimError::Generation("upstream returned 500".to_string()));
            }
            Ok(format!("answer #{}", prompts.len()))
        }

        fn model(&self) -> &str {
            "recording"
        }
    }
}
