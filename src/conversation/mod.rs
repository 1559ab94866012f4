//! Per-chat conversation history.
//!
//! Turns are owned by a `(uid, chat_id)` pair and only ever appended.

mod firestore;
mod memory;

pub use firestore::FirestoreConversationStore;
pub use memory::MemoryConversationStore;

use crate::config::Settings;
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Any role this service does not write. Ignored when building prompts.
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    /// Assigned by the store when the turn was written.
    pub timestamp: DateTime<Utc>,
}

/// The authenticated user a store call is made for.
#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    /// The user's ID token, used as the store credential where the backend needs one.
    pub token: String,
}

/// Storage for chat turns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Up to `limit` turns of a chat, newest first.
    async fn recent_turns(
        &self,
        session: &Session,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>>;

    /// Append a turn with a store-assigned timestamp.
    async fn append_turn(&self, session: &Session, chat_id: &str, role: Role, text: &str)
        -> Result<()>;
}

/// Build the store selected by `[conversations] provider`.
///
/// Returns `None` when history is disabled, in which case requests run
/// without prior context and nothing is persisted.
pub fn from_settings(settings: &Settings) -> Result<Option<Arc<dyn ConversationStore>>> {
    let config = &settings.conversations;
    match config.provider.as_str() {
        "firestore" => match config.resolved_project_id() {
            Some(project_id) => Ok(Some(Arc::new(FirestoreConversationStore::from_settings(
                config, project_id,
            )?))),
            None => {
                tracing::warn!("No project id configured, conversation history is disabled");
                Ok(None)
            }
        },
        "memory" => Ok(Some(Arc::new(MemoryConversationStore::new()))),
        "none" => Ok(None),
        other => Err(AalimError::Config(format!(
            "Unknown conversation store provider: {}",
            other
        ))),
    }
}

/// Accept only ids made of ASCII letters, digits, `-` and `_`.
///
/// Ids are spliced into REST resource paths, so anything else (`/`, `?`, `#`,
/// `%`, whitespace) could change which document or endpoint a request hits.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if id.is_empty() || !id.chars().all(allowed) {
        return Err(AalimError::InvalidInput(format!("Invalid {}: {:?}", kind, id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("assistant"), Role::Assistant);
        assert_eq!(Role::parse("system"), Role::Other);

        let role: Role = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(role, Role::Other);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("chat id", "chat-1").is_ok());
        assert!(validate_id("chat id", "").is_err());
        assert!(validate_id("chat id", "a/b").is_err());
        assert!(validate_id("chat id", "..").is_err());
        assert!(validate_id("user id", "Xq3_9-aZ").is_ok());

        for id in ["a?b", "chat?x=1#frag", "c1#x", "c%2F1", "c 1", "c1:commit", "ج"] {
            assert!(
                matches!(validate_id("chat id", id), Err(AalimError::InvalidInput(_))),
                "{:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.conversations.provider = "memory".to_string();
        assert!(from_settings(&settings).unwrap().is_some());

        settings.conversations.provider = "none".to_string();
        assert!(from_settings(&settings).unwrap().is_none());

        settings.conversations.provider = "redis".to_string();
        assert!(from_settings(&settings).is_err());
    }
}
