//! In-process conversation store.

use super::{validate_id, ConversationStore, ConversationTurn, Role, Session};
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

struct Stored {
    turn: ConversationTurn,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    chats: HashMap<(String, String), Vec<Stored>>,
    next_seq: u64,
}

/// Conversation store held in memory. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryConversationStore {
    inner: Mutex<Inner>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| AalimError::Conversation(format!("Lock error: {}", e)))
    }

    /// Total number of turns across all chats.
    pub fn len(&self) -> usize {
        self.lock()
            .map(|inner| inner.chats.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn recent_turns(
        &self,
        session: &Session,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>> {
        validate_id("chat id", chat_id)?;
        let inner = self.lock()?;
        let Some(stored) = inner.chats.get(&(session.uid.clone(), chat_id.to_string())) else {
            return Ok(Vec::new());
        };

        let mut ordered: Vec<&Stored> = stored.iter().collect();
        ordered.sort_by(|a, b| {
            b.turn
                .timestamp
                .cmp(&a.turn.timestamp)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(ordered
            .into_iter()
            .take(limit)
            .map(|s| s.turn.clone())
            .collect())
    }

    async fn append_turn(
        &self,
        session: &Session,
        chat_id: &str,
        role: Role,
        text: &str,
    ) -> Result<()> {
        validate_id("chat id", chat_id)?;
        let mut inner = self.lock()?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .chats
            .entry((session.uid.clone(), chat_id.to_string()))
            .or_default()
            .push(Stored {
                turn: ConversationTurn {
                    role,
                    text: text.to_string(),
                    timestamp: Utc::now(),
                },
                seq,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(uid: &str) -> Session {
        Session {
            uid: uid.to_string(),
            token: "t".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recent_turns_newest_first() {
        let store = MemoryConversationStore::new();
        let alice = session("alice");
        for i in 0..6 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append_turn(&alice, "c1", role, &format!("m{}", i))
                .await
                .unwrap();
        }

        let turns = store.recent_turns(&alice, "c1", 4).await.unwrap();
        let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m5", "m4", "m3", "m2"]);
        assert_eq!(turns[0].role, Role::Assistant);
        assert_eq!(store.len(), 6);
    }

    #[tokio::test]
    async fn test_chats_are_isolated_per_user() {
        let store = MemoryConversationStore::new();
        store
            .append_turn(&session("alice"), "c1", Role::User, "hello")
            .await
            .unwrap();

        assert!(store
            .recent_turns(&session("bob"), "c1", 10)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .recent_turns(&session("alice"), "c2", 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_chat_id() {
        let store = MemoryConversationStore::new();
        assert!(store
            .append_turn(&session("alice"), "../x", Role::User, "hi")
            .await
            .is_err());
        assert!(store.is_empty());
    }
}
