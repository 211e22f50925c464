use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::auth::{auth_cookies, AuthSession, Session};
use crate::database::models::Profile;
use crate::database::{DataStore, Repository, Scope};
use crate::error::ApiError;
use crate::policy::{decide, RouteClass};
use crate::state::AppState;

/// Access policy and router.
///
/// Runs before any handler: resolves the session, classifies the path, loads
/// the profile when the decision depends on it, then either redirects or lets
/// the request through with `Session` and `Profile` in its extensions. A
/// session renewed from the refresh cookie is written back to the browser
/// unless the handler set cookies itself.
pub async fn access_policy_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (session, renewed) = resolve_session(&state, request.headers()).await;
    let route = RouteClass::classify(request.uri().path());

    let profile = match &session {
        Some(session) if route.needs_profile(true) => {
            fetch_profile(state.store.as_ref(), &session.scope(), session.user_id).await
        }
        _ => None,
    };

    let decision = decide(route, session.is_some(), profile.as_ref().map(|p| &p.roles));

    let mut response = if let Some(location) = decision.location() {
        tracing::debug!("{} {} -> redirect {}", request.method(), request.uri().path(), location);
        Redirect::temporary(&location).into_response()
    } else {
        pass_through(request, next, session, profile, route).await
    };

    if let Some(auth) = renewed {
        if !response.headers().contains_key(header::SET_COOKIE) {
            for cookie in auth_cookies(&state.config.security, &auth).unwrap_or_default() {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
        }
    }
    response
}

async fn pass_through(
    mut request: Request,
    next: Next,
    session: Option<Session>,
    profile: Option<Profile>,
    route: RouteClass,
) -> Response {
    if let (Some(session), None, RouteClass::RoleRoot | RouteClass::RoleScoped(_)) = (&session, &profile, route) {
        tracing::warn!(
            "Degraded access: no profile for user {} on {}, letting request through",
            session.user_id,
            request.uri().path()
        );
    }
    if let Some(session) = session {
        request.extensions_mut().insert(session);
    }
    if let Some(profile) = profile {
        request.extensions_mut().insert(profile);
    }

    next.run(request).await
}

/// Session from the access token, or renewed through the refresh cookie when the
/// access token is missing or no longer valid. A renewal also returns the new
/// tokens so they can be handed back to the browser.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> (Option<Session>, Option<AuthSession>) {
    if let Some(session) = state.sessions.resolve(headers) {
        return (Some(session), None);
    }
    let Some(refresh_token) = state.sessions.refresh_token(headers) else {
        return (None, None);
    };

    let auth = match state.identity.refresh_session(&refresh_token).await {
        Ok(auth) => auth,
        Err(e) => {
            tracing::debug!("Session refresh rejected: {}", e);
            return (None, None);
        }
    };
    match state.sessions.validate(&auth.access_token) {
        Ok(session) => {
            tracing::debug!("Renewed session for user {}", session.user_id);
            (Some(session), Some(auth))
        }
        Err(e) => {
            tracing::warn!("Renewed access token failed validation: {}", e);
            (None, None)
        }
    }
}

/// Look up a profile by auth subject id.
///
/// Missing profiles (signup trigger not done yet) and lookup failures both
/// come back as `None`; failures are logged so operators can see them.
pub async fn fetch_profile(store: &dyn DataStore, scope: &Scope, user_id: Uuid) -> Option<Profile> {
    match Repository::<Profile>::new(store, scope).select_id(user_id).await {
        Ok(Some(profile)) => Some(profile),
        Ok(None) => {
            tracing::debug!("No profile provisioned yet for user {}", user_id);
            None
        }
        Err(e) => {
            tracing::warn!("Profile lookup failed for user {}: {}; treating as absent", user_id, e);
            None
        }
    }
}

/// Handlers ask for `Session` to require an authenticated caller
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
