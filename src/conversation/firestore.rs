//! Conversation store backed by the Firestore REST API.
//!
//! Messages live at `users/{uid}/chats/{chat_id}/messages/{id}` with fields
//! `role`, `text` and a server-assigned `timestamp`. Calls are made with the
//! user's own ID token, so access is governed by the database's security rules.

use super::{validate_id, ConversationStore, ConversationTurn, Role, Session};
use crate::config::ConversationSettings;
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct FirestoreConversationStore {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
}

#[derive(Deserialize)]
struct QueryResult {
    document: Option<FirestoreDocument>,
}

#[derive(Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreConversationStore {
    pub fn new(base_url: &str, project_id: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
        })
    }

    pub fn from_settings(settings: &ConversationSettings, project_id: String) -> Result<Self> {
        Self::new(
            &settings.base_url,
            project_id,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// Resource name of the database's document root.
    fn documents_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn chat_path(&self, session: &Session, chat_id: &str) -> Result<String> {
        validate_id("user id", &session.uid)?;
        validate_id("chat id", chat_id)?;
        Ok(format!(
            "{}/users/{}/chats/{}",
            self.documents_root(),
            session.uid,
            chat_id
        ))
    }

    async fn post(&self, url: &str, session: &Session, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&session.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AalimError::Conversation(format!(
                "Document store returned {}: {}",
                status, text
            )));
        }
        Ok(response.json().await?)
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

fn timestamp_field(fields: &Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(name)?.get("timestampValue")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn turn_from_fields(fields: &Map<String, Value>) -> Option<ConversationTurn> {
    Some(ConversationTurn {
        role: Role::parse(&string_field(fields, "role")?),
        text: string_field(fields, "text")?,
        timestamp: timestamp_field(fields, "timestamp").unwrap_or_else(Utc::now),
    })
}

#[async_trait]
impl ConversationStore for FirestoreConversationStore {
    #[instrument(skip(self, session), fields(uid = %session.uid))]
    async fn recent_turns(
        &self,
        session: &Session,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}/{}:runQuery", self.base_url, self.chat_path(session, chat_id)?);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": "messages" }],
                "orderBy": [{
                    "field": { "fieldPath": "timestamp" },
                    "direction": "DESCENDING"
                }],
                "limit": limit
            }
        });

        let response = self.post(&url, session, &body).await?;
        let results: Vec<QueryResult> = serde_json::from_value(response)?;
        let turns: Vec<ConversationTurn> = results
            .into_iter()
            .filter_map(|r| r.document)
            .filter_map(|doc| turn_from_fields(&doc.fields))
            .collect();

        debug!("Loaded {} turns", turns.len());
        Ok(turns)
    }

    #[instrument(skip(self, session, text), fields(uid = %session.uid))]
    async fn append_turn(
        &self,
        session: &Session,
        chat_id: &str,
        role: Role,
        text: &str,
    ) -> Result<()> {
        let name = format!(
            "{}/messages/{}",
            self.chat_path(session, chat_id)?,
            Uuid::new_v4().simple()
        );
        let url = format!("{}/{}:commit", self.base_url, self.documents_root());
        let body = json!({
            "writes": [{
                "update": {
                    "name": name,
                    "fields": {
                        "role": { "stringValue": role.as_str() },
                        "text": { "stringValue": text }
                    }
                },
                "updateTransforms": [{
                    "fieldPath": "timestamp",
                    "setToServerValue": "REQUEST_TIME"
                }]
            }]
        });

        self.post(&url, session, &body).await?;
        Ok(())
    }
}
