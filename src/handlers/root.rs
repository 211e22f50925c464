use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;

use crate::auth::Session;
use crate::middleware::fetch_profile;
use crate::policy::{DASHBOARD_PATH, LOGIN_PATH};
use crate::state::AppState;

/// GET / - send the caller where they belong
pub async fn root(State(state): State<AppState>, session: Option<Session>) -> Response {
    let Some(session) = session else {
        return Redirect::temporary(LOGIN_PATH).into_response();
    };
    let location = match fetch_profile(state.store.as_ref(), &session.scope(), session.user_id).await {
        Some(profile) => profile.roles.canonical().root_path(),
        None => DASHBOARD_PATH.to_string(),
    };
    Redirect::temporary(&location).into_response()
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": now,
                    "data_store": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "data store unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "data_store_error": e.to_string()
                }
            })),
        ),
    }
}
