//! The question answering pipeline behind `POST /ask`.
//!
//! Each request runs: authenticate (optional) → load chat history (optional) →
//! retrieve passages → assemble prompt → generate → persist turn (optional).
//! Authentication and history problems degrade the request; retrieval and
//! generation problems fail it.

use crate::config::{Prompts, Settings};
use crate::conversation::{self, ConversationStore, Role, Session};
use crate::embedding;
use crate::error::{AalimError, Result};
use crate::generation::{self, Generator};
use crate::identity::{self, AuthResult, IdentityVerifier, NoIdentity};
use crate::rag::context::format_history_for_prompt;
use crate::rag::{format_passages_for_prompt, Retriever};
use crate::vector_store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Body of `POST /ask`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    /// ID token of the caller. Absent or empty means guest.
    #[serde(default)]
    pub token: Option<String>,
    /// Chat whose history is used and extended. Only honored for authenticated callers.
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Number of passages to retrieve. Defaults to `[retrieval] default_k`.
    #[serde(default)]
    pub k: Option<usize>,
}

impl QuestionRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            token: None,
            chat_id: None,
            k: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: String,
}

/// Answers questions from the indexed corpus, optionally within a persisted chat.
pub struct AnswerService {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    identity: Arc<dyn IdentityVerifier>,
    conversations: Option<Arc<dyn ConversationStore>>,
    prompts: Prompts,
    default_k: usize,
    history_turns: usize,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AnswerService {
    /// Create a guest-only service without conversation history.
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            identity: Arc::new(NoIdentity),
            conversations: None,
            prompts: Prompts::default(),
            default_k: 5,
            history_turns: 5,
        }
    }

    /// Wire every dependency from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = embedding::from_settings(&settings.embedding)?;
        let store = vector_store::open(settings)?;
        let retriever = Retriever::new(store, embedder, &settings.vector_store.collection);

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let mut service = Self::new(retriever, generation::from_settings(settings)?)
            .with_identity(identity::from_settings(settings)?)
            .with_prompts(prompts)
            .with_default_k(settings.retrieval.default_k)
            .with_history_turns(settings.conversations.history_turns);
        if let Some(store) = conversation::from_settings(settings)? {
            service = service.with_conversations(store);
        }
        Ok(service)
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_conversations(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.conversations = Some(store);
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    /// Number of user+assistant pairs loaded as prior context.
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    /// Answer one question.
    #[instrument(skip_all, fields(chat = request.chat_id.is_some()))]
    pub async fn ask(&self, request: QuestionRequest) -> Result<AnswerResponse> {
        if request.question.trim().is_empty() {
            return Err(AalimError::InvalidInput("question must not be empty".to_string()));
        }
        let k = request.k.unwrap_or(self.default_k);

        let auth = match non_empty(request.token) {
            Some(token) => self.identity.verify(&token).await,
            None => AuthResult::Guest,
        };

        if let Some(uid) = auth.uid() {
            debug!(uid, "Caller authenticated");
        }

        let chat = match (auth, non_empty(request.chat_id), &self.conversations) {
            (AuthResult::Authenticated { uid, token }, Some(chat_id), Some(store)) => {
                conversation::validate_id("chat id", &chat_id)?;
                Some((store, Session { uid, token }, chat_id))
            }
            _ => None,
        };

        let chat_history = match &chat {
            Some((store, session, chat_id)) => self.load_history(store.as_ref(), session, chat_id).await,
            None => String::new(),
        };

        let passages = self.retriever.retrieve(&request.question, k).await?;
        let context = format_passages_for_prompt(&passages);
        let prompt = self
            .prompts
            .render_answer(&chat_history, &context, &request.question);
        debug!("Prompt assembled from {} passages", passages.len());

        let answer = self.generator.generate(&prompt).await?;

        if let Some((store, session, chat_id)) = &chat {
            self.persist_turn(store.as_ref(), session, chat_id, &request.question, &answer)
                .await;
        }

        info!(passages = passages.len(), "Answered question");
        Ok(AnswerResponse {
            question: request.question,
            answer,
        })
    }

    /// Render the most recent turns as prompt text. Failures yield empty history.
    async fn load_history(
        &self,
        store: &dyn ConversationStore,
        session: &Session,
        chat_id: &str,
    ) -> String {
        let limit = self.history_turns * 2;
        match store.recent_turns(session, chat_id, limit).await {
            Ok(mut turns) => {
                turns.reverse();
                format_history_for_prompt(&turns, limit)
            }
            Err(e) => {
                warn!("Failed to load chat history, continuing without it: {}", e);
                String::new()
            }
        }
    }

    /// Append the question and answer. Failures are logged only.
    async fn persist_turn(
        &self,
        store: &dyn ConversationStore,
        session: &Session,
        chat_id: &str,
        question: &str,
        answer: &str,
    ) {
        if let Err(e) = store.append_turn(session, chat_id, Role::User, question).await {
            warn!("Failed to save question: {}", e);
            return;
        }
        if let Err(e) = store
            .append_turn(session, chat_id, Role::Assistant, answer)
            .await
        {
            warn!("Failed to save answer: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Service fixtures shared with the HTTP router tests.

    use super::*;
    use crate::conversation::MemoryConversationStore;
    use crate::embedding::testing::LetterEmbedder;
    use crate::generation::testing::RecordingGenerator;
    use crate::vector_store::{Document, MemoryVectorStore, VectorStore};
    use async_trait::async_trait;
    use serde_json::json;

    /// Accepts the token `valid` as user `u1`.
    pub struct StaticIdentity;

    #[async_trait]
    impl IdentityVerifier for StaticIdentity {
        async fn verify(&self, token: &str) -> AuthResult {
            if token == "valid" {
                AuthResult::Authenticated {
                    uid: "u1".to_string(),
                    token: token.to_string(),
                }
            } else {
                AuthResult::Guest
            }
        }
    }

    pub struct Fixture {
        pub service: AnswerService,
        pub generator: Arc<RecordingGenerator>,
        pub conversations: Arc<MemoryConversationStore>,
    }

    pub async fn fixture(generator: RecordingGenerator) -> Fixture {
        let store = Arc::new(MemoryVectorStore::new());
        let docs = vec![
            Document::new(
                "islam_data",
                "Zakat is a yearly charity of 2.5% on savings.".to_string(),
                json!({"source": "Sahih Bukhari", "title": "Book of Zakat"})
                    .as_object()
                    .cloned()
                    .unwrap(),
                LetterEmbedder::vector("Zakat is a yearly charity of 2.5% on savings."),
            ),
            Document::new(
                "islam_data",
                "Fasting in Ramadan is obligatory.".to_string(),
                json!({"source_type": "video", "title": "Ramadan"})
                    .as_object()
                    .cloned()
                    .unwrap(),
                LetterEmbedder::vector("Fasting in Ramadan is obligatory."),
            ),
        ];
        store.insert_batch(&docs).await.unwrap();

        let retriever = Retriever::new(store, Arc::new(LetterEmbedder::default()), "islam_data");
        let generator = Arc::new(generator);
        let conversations = Arc::new(MemoryConversationStore::new());
        let service = AnswerService::new(retriever, generator.clone())
            .with_identity(Arc::new(StaticIdentity))
            .with_conversations(conversations.clone());

        Fixture {
            service,
            generator,
            conversations,
        }
    }
}
