//! Signed-in user context.
//!
//! The session is an explicit value handed to whatever needs the current
//! identity (the HTTP adapter for its bearer token, the CLI for the greeting).
//! It is persisted as JSON so a later invocation picks it up again.

use crate::types::ItemId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Name shown when nobody is signed in.
pub const GUEST_NAME: &str = "Guest";

/// User returned by the authentication endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub username: String,
    /// Empty when the server answered without issuing a token.
    #[serde(default)]
    pub token: String,
    /// Token expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            token: token.into(),
            expires_at: None,
            token_type: None,
            email: None,
            first_name: None,
            last_name: None,
            role: None,
        }
    }
}

/// Current user plus the page to return to after signing in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user: UserProfile) {
        if user.id.is_none() {
            warn!(
                username = %user.username,
                "Signed in without a user id; profile details may be incomplete"
            );
        }
        self.user = Some(user);
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(chrono::Utc::now().timestamp_millis())
    }

    /// Authenticated means a non-empty token that has not expired at `now_ms`.
    pub fn is_authenticated_at(&self, now_ms: i64) -> bool {
        match &self.user {
            Some(user) if !user.token.is_empty() => {
                user.expires_at.is_none_or(|expires| expires > now_ms)
            }
            _ => false,
        }
    }

    /// Bearer token, if the session is authenticated.
    pub fn token(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.user.as_ref().map(|u| u.token.as_str())
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.first_name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(GUEST_NAME)
    }

    pub fn set_redirect(&mut self, url: impl Into<String>) {
        self.redirect_url = Some(url.into());
    }

    /// Consume the stored redirect target.
    pub fn take_redirect(&mut self) -> Option<String> {
        self.redirect_url.take()
    }

    /// Load a session file. A missing file yields an anonymous session.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No session file, starting anonymous");
            return Ok(Self::anonymous());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file {}", path.display()))?;
        Ok(session)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write session file {}", path.display()))?;
        Ok(())
    }
}
