//! Caller identity verification.
//!
//! A request may carry an ID token. Verification never fails a request: any
//! problem with the token degrades the caller to a guest.

mod firebase;

pub use firebase::FirebaseIdentity;

use crate::config::Settings;
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of verifying a caller's token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// The token is valid. It is kept so the conversation store can act on the user's behalf.
    Authenticated { uid: String, token: String },
    Guest,
}

impl AuthResult {
    pub fn uid(&self) -> Option<&str> {
        match self {
            AuthResult::Authenticated { uid, .. } => Some(uid),
            AuthResult::Guest => None,
        }
    }
}

/// Verifies ID tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token`. Implementations return `Guest` instead of an error.
    async fn verify(&self, token: &str) -> AuthResult;
}

/// Verifier used when identity is disabled. Every caller is a guest.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIdentity;

#[async_trait]
impl IdentityVerifier for NoIdentity {
    async fn verify(&self, _token: &str) -> AuthResult {
        AuthResult::Guest
    }
}

/// Build the verifier selected by `[identity] provider`.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn IdentityVerifier>> {
    match settings.identity.provider.as_str() {
        "firebase" => match settings.identity.resolved_api_key() {
            Some(api_key) => Ok(Arc::new(FirebaseIdentity::from_settings(
                &settings.identity,
                api_key,
            )?)),
            None => {
                tracing::warn!("No identity API key configured, all requests are treated as guests");
                Ok(Arc::new(NoIdentity))
            }
        },
        "none" => Ok(Arc::new(NoIdentity)),
        other => Err(AalimError::Config(format!("Unknown identity provider: {}", other))),
    }
}
