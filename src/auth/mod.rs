pub mod identity;

pub use identity::{AuthSession, GoTrueClient, IdentityError, IdentityProvider, IdentityUser, SignUpMetadata};

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::Scope;

/// Audience the hosted auth service stamps on user access tokens
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims of an access token issued by the hosted auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: Option<String>,
    pub aud: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: Option<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            aud: AUTHENTICATED_AUDIENCE.to_string(),
            role: AUTHENTICATED_AUDIENCE.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Sign claims the way the hosted auth service does (HS256, shared secret)
pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Authenticated caller, resolved from request credentials
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub access_token: String,
}

impl Session {
    /// Data store scope carrying this caller's token
    pub fn scope(&self) -> Scope {
        Scope::user(self.access_token.clone())
    }
}

/// Resolves the caller's session from the session cookie or a bearer token.
///
/// Resolution is local: the access token is a signed JWT, so no round-trip to
/// the auth service is needed on every request. Renewing an expired token
/// with the refresh cookie is left to the caller, which owns the identity
/// provider.
#[derive(Clone)]
pub struct SessionResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
    refresh_cookie_name: Option<String>,
}

impl SessionResolver {
    pub fn new(jwt_secret: &str, cookie_name: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
            cookie_name: cookie_name.into(),
            refresh_cookie_name: None,
        }
    }

    pub fn with_refresh_cookie(mut self, name: impl Into<String>) -> Self {
        self.refresh_cookie_name = Some(name.into());
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.backend.jwt_secret, config.security.session_cookie.clone())
            .with_refresh_cookie(config.security.refresh_cookie.clone())
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Refresh token carried by the request, if refresh is configured
    pub fn refresh_token(&self, headers: &HeaderMap) -> Option<String> {
        read_cookie(headers, self.refresh_cookie_name.as_deref()?)
    }

    /// `None` for absent, malformed, expired or forged credentials
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Session> {
        let token = extract_token(headers, &self.cookie_name)?;
        match self.validate(&token) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                None
            }
        }
    }

    pub fn validate(&self, token: &str) -> Result<Session, jsonwebtoken::errors::Error> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;
        Ok(Session {
            user_id: claims.sub,
            email: claims.email,
            expires_at: Utc.timestamp_opt(claims.exp, 0).single().unwrap_or_else(Utc::now),
            access_token: token.to_string(),
        })
    }
}

/// Session cookie first, then `Authorization: Bearer`
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = read_cookie(headers, cookie_name) {
        return Some(token);
    }
    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(name: &str, token: &str, max_age_secs: u64, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", name, token, max_age_secs);
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

pub fn clear_session_cookie(name: &str, secure: bool) -> Option<HeaderValue> {
    session_cookie(name, "", 0, secure)
}

/// `Set-Cookie` values for newly issued tokens: the access token, capped at its
/// own lifetime, then the refresh token, kept for the whole session window.
/// `None` when the access token cannot be carried in a header.
pub fn auth_cookies(security: &SecurityConfig, auth: &AuthSession) -> Option<Vec<HeaderValue>> {
    let max_age = u64::try_from(auth.expires_in).unwrap_or(0).min(security.session_max_age_secs);
    let mut cookies = vec![session_cookie(
        &security.session_cookie,
        &auth.access_token,
        max_age,
        security.cookie_secure,
    )?];
    if let Some(refresh_token) = auth.refresh_token.as_deref().filter(|t| !t.is_empty()) {
        cookies.push(session_cookie(
            &security.refresh_cookie,
            refresh_token,
            security.session_max_age_secs,
            security.cookie_secure,
        )?);
    }
    Some(cookies)
}

/// Expire both the access and the refresh cookie
pub fn clear_auth_cookies(security: &SecurityConfig) -> Vec<HeaderValue> {
    [&security.session_cookie, &security.refresh_cookie]
        .into_iter()
        .filter_map(|name| clear_session_cookie(name, security.cookie_secure))
        .collect()
}
