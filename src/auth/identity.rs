use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::BackendConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Auth service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Auth service unreachable: {0}")]
    Transport(String),

    #[error("Failed to decode auth service response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IdentityError::Decode(err.to_string())
        } else {
            IdentityError::Transport(err.to_string())
        }
    }
}

/// User metadata attached at signup; the profile trigger copies it into `profiles`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SignUpMetadata {
    pub nom: String,
    pub prenom: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens handed out after a successful sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub user: IdentityUser,
}

/// Hosted identity provider: password sign-in, session refresh, sign-up, sign-out
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    /// Trade a refresh token for a new access token (and a rotated refresh token)
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<IdentityUser, IdentityError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

/// HTTP client for the hosted GoTrue auth API
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    auth_url: Url,
    anon_key: String,
}

impl GoTrueClient {
    pub fn new(config: &BackendConfig) -> Result<Self, IdentityError> {
        let base = Url::parse(&config.url)
            .map_err(|e| IdentityError::Transport(format!("invalid backend URL '{}': {}", config.url, e)))?;
        let auth_url = base
            .join("auth/v1/")
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            auth_url,
            anon_key: config.anon_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.auth_url
            .join(path)
            .map_err(|e| IdentityError::Transport(e.to_string()))
    }

    /// `token` endpoint for one OAuth grant type
    fn token_url(&self, grant_type: &str) -> Result<Url, IdentityError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    async fn check(response: Response) -> Result<Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Err(error_from_body(status, &body))
    }
}

/// Map an auth API error body to an `IdentityError`
fn error_from_body(status: StatusCode, body: &Value) -> IdentityError {
    let code = body.get("error").and_then(Value::as_str).unwrap_or_default();
    if status == StatusCode::BAD_REQUEST && code == "invalid_grant" {
        return IdentityError::InvalidCredentials;
    }
    let message = ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .unwrap_or("unknown error")
        .to_string();
    IdentityError::Rejected { status: status.as_u16(), message }
}

/// Signup answers with a full session when auto-confirm is on, or a bare user otherwise
fn user_from_signup(body: Value) -> Result<IdentityUser, IdentityError> {
    let user = match body.get("user") {
        Some(user) if user.is_object() => user.clone(),
        _ => body,
    };
    serde_json::from_value(user).map_err(|e| IdentityError::Decode(e.to_string()))
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let response = self
            .http
            .post(self.token_url("password")?)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session = Self::check(response).await?.json::<AuthSession>().await?;
        tracing::info!("Signed in user {}", session.user.id);
        Ok(session)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, IdentityError> {
        let response = self
            .http
            .post(self.token_url("refresh_token")?)
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let session = Self::check(response).await?.json::<AuthSession>().await?;
        tracing::debug!("Refreshed session for user {}", session.user.id);
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<IdentityUser, IdentityError> {
        let response = self
            .http
            .post(self.endpoint("signup")?)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body = Self::check(response).await?.json::<Value>().await?;
        let user = user_from_signup(body)?;
        tracing::info!("Signed up user {}", user.id);
        Ok(user)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(self.endpoint("logout")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
