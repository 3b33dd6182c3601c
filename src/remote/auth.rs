//! Account endpoints: sign in and registration.
//!
//! These live beside the collections at `{api_url}/auth/login` and
//! `{api_url}/auth/register` and are called without a bearer token.

use super::http::{build_client, decode, send};
use super::{RemoteError, RemoteResult};
use crate::session::UserProfile;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// New account details sent to the registration endpoint.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Client for the authentication endpoints.
pub struct AuthClient {
    client: Client,
    auth_url: String,
}

impl AuthClient {
    pub fn new(api_url: &str, timeout: Option<Duration>) -> RemoteResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            auth_url: format!("{}/auth", api_url.trim_end_matches('/')),
        })
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Exchange credentials for a signed-in profile.
    ///
    /// A response without a token is reported as a decode failure; the
    /// profile is useless for later requests.
    pub async fn login(&self, username: &str, password: &str) -> RemoteResult<UserProfile> {
        let url = format!("{}/login", self.auth_url);
        let body = Credentials { username, password };
        let resp = send(self.client.post(&url).json(&body)).await?;
        let user: UserProfile = decode(resp).await?;

        if user.token.is_empty() {
            warn!(username, "Login response carried no token");
            return Err(RemoteError::decode("login response did not include a token"));
        }
        info!(username = %user.username, "Signed in");
        Ok(user)
    }

    /// Create an account. The returned profile may not carry a token; sign
    /// in afterwards to obtain one.
    pub async fn register(&self, registration: &Registration) -> RemoteResult<UserProfile> {
        let url = format!("{}/register", self.auth_url);
        let resp = send(self.client.post(&url).json(registration)).await?;
        let user: UserProfile = decode(resp).await?;
        debug!(username = %user.username, id = ?user.id, "Registered account");
        Ok(user)
    }
}
