use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::{auth_cookies, clear_auth_cookies, Session, SignUpMetadata};
use crate::database::Scope;
use crate::error::ApiError;
use crate::handlers::dashboard::require_text;
use crate::middleware::{fetch_profile, ApiResponse, ApiResult};
use crate::policy::{DASHBOARD_PATH, LOGIN_PATH};
use crate::state::AppState;

/// Minimum password length accepted by the auth service
pub const MIN_PASSWORD_LEN: usize = 6;

/// Basic shape checks before anything is sent to the auth service
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    let email = email.trim();
    if email.is_empty() {
        field_errors.insert("email".to_string(), "Email is required".to_string());
    } else if !email.contains('@') {
        field_errors.insert("email".to_string(), "Email is not valid".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        field_errors.insert(
            "password".to_string(),
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Invalid credentials format", Some(field_errors)))
    }
}

/// GET /login
pub async fn login_page() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "page": "login", "submit": LOGIN_PATH })))
}

/// GET /signup
pub async fn signup_page() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "page": "signup", "submit": "/signup" })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub redirect: String,
    pub expires_in: i64,
}

/// POST /login - sign in, set the session cookies and point at the caller's dashboard
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload?;
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let auth = state
        .identity
        .sign_in_with_password(payload.email.trim(), &payload.password)
        .await
        .map_err(|e| {
            tracing::info!("Failed login for {}: {}", payload.email.trim(), e);
            ApiError::from(e)
        })?;

    let scope = Scope::user(auth.access_token.clone());
    let redirect = match fetch_profile(state.store.as_ref(), &scope, auth.user.id).await {
        Some(profile) => profile.roles.canonical().root_path(),
        None => DASHBOARD_PATH.to_string(),
    };

    let cookies = auth_cookies(&state.config.security, &auth)
        .ok_or_else(|| ApiError::bad_gateway("Auth service returned an unusable token"))?;

    let response = ApiResponse::success(LoginResponse {
        user_id: auth.user.id,
        email: auth.user.email,
        redirect,
        expires_in: auth.expires_in,
    });
    Ok(cookies
        .into_iter()
        .fold(response, |response, cookie| response.with_header(header::SET_COOKIE, cookie)))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nom: String,
    pub prenom: String,
}

/// POST /signup - create the account; the profile row is provisioned by the backend
pub async fn signup_post(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(payload) = payload?;
    validate_credentials(&payload.email, &payload.password)?;
    require_text("nom", &payload.nom)?;
    require_text("prenom", &payload.prenom)?;

    let metadata = SignUpMetadata {
        nom: payload.nom.trim().to_string(),
        prenom: payload.prenom.trim().to_string(),
    };
    let user = state
        .identity
        .sign_up(payload.email.trim(), &payload.password, &metadata)
        .await?;

    Ok(ApiResponse::created(json!({
        "user_id": user.id,
        "email": user.email,
        "redirect": LOGIN_PATH,
    })))
}

/// POST /logout - sign out at the provider, drop both cookies, back to login
pub async fn logout(State(state): State<AppState>, session: Option<Session>) -> Response {
    if let Some(session) = &session {
        if let Err(e) = state.identity.sign_out(&session.access_token).await {
            tracing::warn!("Sign-out failed for user {}: {}", session.user_id, e);
        }
    }

    let mut response = Redirect::to(LOGIN_PATH).into_response();
    for cookie in clear_auth_cookies(&state.config.security) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}
