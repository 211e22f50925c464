use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{dashboard, public, root};
use crate::middleware::access_policy_middleware;
use crate::state::AppState;

/// Full application router with the access policy in front of every route
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.security))
        .layer(TimeoutLayer::new(state.config.server_request_timeout()));

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(root::health))
        .merge(public_routes())
        .merge(dashboard_routes())
        .layer(from_fn_with_state(state.clone(), access_policy_middleware))
        .layer(middleware)
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(public::login_page).post(public::login_post))
        .route("/signup", get(public::signup_page).post(public::signup_post))
        .route("/logout", post(public::logout))
}

fn dashboard_routes() -> Router<AppState> {
    use dashboard::{admin, client, commercial};

    Router::new()
        .route("/dashboard", get(dashboard::waiting_page))
        // Admin
        .route("/dashboard/admin", get(admin::overview))
        .route("/dashboard/admin/utilisateurs", get(admin::list_users).post(admin::create_user))
        .route("/dashboard/admin/commandes", get(admin::list_commandes))
        .route("/dashboard/admin/stock", get(admin::list_stock).post(admin::create_stock))
        .route("/dashboard/admin/stock/:id", put(admin::update_stock).delete(admin::delete_stock))
        // Commercial
        .route("/dashboard/commercial", get(commercial::overview))
        .route(
            "/dashboard/commercial/clients",
            get(commercial::list_clients).post(commercial::create_client),
        )
        .route(
            "/dashboard/commercial/clients/:id",
            put(commercial::update_client).delete(commercial::delete_client),
        )
        .route("/dashboard/commercial/commandes", get(commercial::list_commandes))
        // Client
        .route("/dashboard/client", get(client::overview))
        .route("/dashboard/client/nouvelle-commande", post(client::nouvelle_commande))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    // Credentialed requests carry the session cookie
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
