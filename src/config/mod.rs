//! Configuration module for Aalim.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    ConversationSettings, EmbeddingSettings, GeneralSettings, GenerationProvider,
    GenerationSettings, IdentitySettings, IndexingSettings, PromptSettings, RetrievalSettings,
    ScraperSettings, ServerSettings, Settings, VectorStoreSettings, GEMINI_BASE_URL,
};
