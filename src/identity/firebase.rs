//! Token verification against the identity toolkit REST API.

use super::{AuthResult, IdentityVerifier};
use crate::config::IdentitySettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Resolves ID tokens to user ids with `accounts:lookup`.
pub struct FirebaseIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
}

impl FirebaseIdentity {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_settings(settings: &IdentitySettings, api_key: String) -> Result<Self> {
        Self::new(
            &settings.base_url,
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    async fn lookup(&self, token: &str) -> Result<Option<String>> {
        let url = format!("{}/accounts:lookup", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!("Token lookup returned {}", status);
            return Ok(None);
        }

        let body: LookupResponse = response.json().await?;
        Ok(body.users.into_iter().next().map(|u| u.local_id))
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseIdentity {
    #[instrument(skip_all)]
    async fn verify(&self, token: &str) -> AuthResult {
        match self.lookup(token).await {
            Ok(Some(uid)) if !uid.is_empty() => AuthResult::Authenticated {
                uid,
                token: token.to_string(),
            },
            Ok(_) => {
                warn!("Invalid token, continuing as guest");
                AuthResult::Guest
            }
            Err(e) => {
                warn!("Token verification failed, continuing as guest: {}", e);
                AuthResult::Guest
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity(server: &MockServer) -> FirebaseIdentity {
        FirebaseIdentity::new(&server.uri(), "web-key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_is_authenticated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:lookup"))
            .and(query_param("key", "web-key"))
            .and(body_json(serde_json::json!({ "idToken": "good" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "identitytoolkit#GetAccountInfoResponse",
                "users": [{ "localId": "uid-42", "email": "a@b.c" }]
            })))
            .mount(&server)
            .await;

        assert_eq!(
            identity(&server).verify("good").await,
            AuthResult::Authenticated {
                uid: "uid-42".to_string(),
                token: "good".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_token_is_guest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:lookup"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "INVALID_ID_TOKEN" }
            })))
            .mount(&server)
            .await;

        assert_eq!(identity(&server).verify("bad").await, AuthResult::Guest);
    }

    #[tokio::test]
    async fn test_empty_users_and_garbage_are_guest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:lookup"))
            .and(body_json(serde_json::json!({ "idToken": "nobody" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/accounts:lookup"))
            .and(body_json(serde_json::json!({ "idToken": "garbled" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let identity = identity(&server);
        assert_eq!(identity.verify("nobody").await, AuthResult::Guest);
        assert_eq!(identity.verify("garbled").await, AuthResult::Guest);
    }
}
