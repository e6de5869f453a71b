//! Client for the hosted auth REST API (`/auth/v1`)

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::session::{Session, SessionRefresher, User};
use crate::config::SupabaseCredentials;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct AuthClient {
    http_client: HttpClient,
    auth_url: String,
    anon_key: String,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("auth_url", &self.auth_url)
            .finish()
    }
}

/// Result of a sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    /// Signed in straight away
    Session(Session),
    /// The user must confirm their email first
    #[serde(rename_all = "camelCase")]
    ConfirmationRequired {
        confirmation_required: bool,
        user: User,
    },
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

fn require_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

/// Transport failure talking to the auth API
fn transport_error(e: reqwest::Error) -> Error {
    Error::AuthUnavailable(e.to_string())
}

/// Map an auth API failure
async fn auth_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let value = serde_json::from_str::<Value>(&body).unwrap_or(Value::Null);

    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
    let message = field("error_description")
        .or_else(|| field("msg"))
        .or_else(|| field("message"))
        .or_else(|| field("error"))
        .unwrap_or_else(|| format!("HTTP {}", status));

    let invalid_grant = field("error").as_deref() == Some("invalid_grant");
    match status {
        401 | 403 => Error::Unauthorized(message),
        400 if invalid_grant => Error::Unauthorized(message),
        _ => Error::AuthError(message),
    }
}

impl AuthClient {
    pub fn new(credentials: &SupabaseCredentials) -> Result<Self> {
        let http_client = HttpClient::builder().build().map_err(Error::NetworkError)?;
        Ok(Self {
            http_client,
            auth_url: format!("{}/auth/v1", credentials.url.trim_end_matches('/')),
            anon_key: credentials.anon_key.clone(),
        })
    }

    async fn token(&self, grant_type: &str, body: Value) -> Result<Session> {
        let response = self
            .http_client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::AuthError(format!("Failed to parse session: {}", e)))?;
        Ok(token.into_session())
    }

    /// Password sign-in
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        require_credentials(email, password)?;
        let session = self
            .token("password", json!({"email": email.trim(), "password": password}))
            .await?;
        info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    /// Register a new account
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        require_credentials(email, password)?;

        let response = self
            .http_client
            .post(format!("{}/signup", self.auth_url))
            .header("apikey", &self.anon_key)
            .json(&json!({"email": email.trim(), "password": password}))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::AuthError(format!("Failed to parse sign-up response: {}", e)))?;

        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)
                .map_err(|e| Error::AuthError(format!("Failed to parse session: {}", e)))?;
            return Ok(SignUpOutcome::Session(token.into_session()));
        }

        // Without auto-confirm the API returns the bare user
        let user: User = serde_json::from_value(value.get("user").cloned().unwrap_or(value))
            .map_err(|e| Error::AuthError(format!("Failed to parse user: {}", e)))?;
        debug!(user_id = %user.id, "Sign-up awaiting email confirmation");
        Ok(SignUpOutcome::ConfirmationRequired {
            confirmation_required: true,
            user,
        })
    }

    /// Trade a refresh token for a new session
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        if refresh_token.is_empty() {
            return Err(Error::InvalidInput("Refresh token is required".to_string()));
        }
        self.token("refresh_token", json!({"refresh_token": refresh_token}))
            .await
    }

    /// Resolve the user behind an access token
    pub async fn get_user(&self, access_token: &str) -> Result<User> {
        let response = self
            .http_client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| Error::AuthError(format!("Failed to parse user: {}", e)))
    }

    /// Revoke the session behind an access token
    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .http_client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRefresher for AuthClient {
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.refresh(refresh_token).await
    }
}
