use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{
    commande_views, require_text, with_parties, CommandeView, ListParams, ProfileView, DEFAULT_ORDER, RECENT_LIMIT,
};
use crate::auth::{Session, SignUpMetadata};
use crate::database::models::{Commande, NewStockItem, Profile, StockItem};
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::Role;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AdminOverview {
    pub total_commandes: u64,
    pub total_users: u64,
    pub total_stock: u64,
    pub recent_commandes: Vec<CommandeView>,
}

/// GET /dashboard/admin - activity overview
pub async fn overview(State(state): State<AppState>, session: Session) -> ApiResult<AdminOverview> {
    let scope = session.scope();
    let commandes = Repository::<Commande>::new(state.store.as_ref(), &scope);
    let profiles = Repository::<Profile>::new(state.store.as_ref(), &scope);
    let stock = Repository::<StockItem>::new(state.store.as_ref(), &scope);

    let all_commandes = commandes.filter();
    let all_profiles = profiles.filter();
    let all_stock = stock.filter();
    let mut recent = commandes.filter();
    with_parties(&mut recent)?.order(DEFAULT_ORDER)?.limit(RECENT_LIMIT)?;

    let (total_commandes, total_users, total_stock, recent_commandes) = futures::try_join!(
        commandes.count(&all_commandes),
        profiles.count(&all_profiles),
        stock.count(&all_stock),
        commandes.select_any(&recent),
    )?;

    Ok(ApiResponse::success(AdminOverview {
        total_commandes,
        total_users,
        total_stock,
        recent_commandes: commande_views(recent_commandes),
    }))
}

/// GET /dashboard/admin/utilisateurs
pub async fn list_users(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<ProfileView>> {
    let scope = session.scope();
    let repo = Repository::<Profile>::new(state.store.as_ref(), &scope);
    let mut filter = repo.filter();
    filter.order(params.order_or(DEFAULT_ORDER))?;

    let users = repo.select_any(&filter).await?;
    Ok(ApiResponse::success(users.into_iter().map(ProfileView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub nom: String,
    pub prenom: String,
    pub role: Role,
}

/// POST /dashboard/admin/utilisateurs - create an account, then set its role
pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let Json(payload) = payload?;
    crate::handlers::public::auth::validate_credentials(&payload.email, &payload.password)?;
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

    // The profile row comes from the signup trigger; only its role is ours to set
    let scope = session.scope();
    let updated = Repository::<Profile>::new(state.store.as_ref(), &scope)
        .update_id(user.id, &json!({ "role": payload.role }))
        .await?;

    if updated == 0 {
        tracing::warn!("Account {} created but its profile row is missing; role {} not applied", user.id, payload.role);
        return Ok(ApiResponse::with_status(
            json!({ "id": user.id, "email": user.email, "role": null, "status": "profile_pending" }),
            StatusCode::ACCEPTED,
        ));
    }

    tracing::info!("User {} created {} with role {}", session.user_id, user.id, payload.role);
    Ok(ApiResponse::created(json!({ "id": user.id, "email": user.email, "role": payload.role })))
}

/// GET /dashboard/admin/commandes
pub async fn list_commandes(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<CommandeView>> {
    let scope = session.scope();
    let repo = Repository::<Commande>::new(state.store.as_ref(), &scope);
    let mut filter = repo.filter();
    with_parties(&mut filter)?.order(params.order_or(DEFAULT_ORDER))?;

    Ok(ApiResponse::success(commande_views(repo.select_any(&filter).await?)))
}

/// GET /dashboard/admin/stock
pub async fn list_stock(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<StockItem>> {
    let scope = session.scope();
    let repo = Repository::<StockItem>::new(state.store.as_ref(), &scope);
    let mut filter = repo.filter();
    filter.order(params.order_or("nom asc"))?;

    Ok(ApiResponse::success(repo.select_any(&filter).await?))
}

/// POST /dashboard/admin/stock
pub async fn create_stock(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<NewStockItem>, JsonRejection>,
) -> ApiResult<NewStockItem> {
    let Json(item) = payload?;
    item.validate().map_err(|msg| ApiError::validation_error(msg, None))?;

    let scope = session.scope();
    Repository::<StockItem>::new(state.store.as_ref(), &scope).insert(&item).await?;
    Ok(ApiResponse::created(item))
}

/// PUT /dashboard/admin/stock/:id
pub async fn update_stock(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    payload: Result<Json<NewStockItem>, JsonRejection>,
) -> ApiResult<()> {
    let Json(item) = payload?;
    item.validate().map_err(|msg| ApiError::validation_error(msg, None))?;

    let scope = session.scope();
    let repo = Repository::<StockItem>::new(state.store.as_ref(), &scope);
    if repo.select_id(id).await?.is_none() {
        return Err(ApiError::not_found(format!("Stock item {} not found", id)));
    }
    repo.update_id(
        id,
        &json!({
            "nom": item.nom,
            "quantite": item.quantite,
            "unite": item.unite,
            "updated_at": Utc::now(),
        }),
    )
    .await?;
    Ok(ApiResponse::no_content())
}

/// DELETE /dashboard/admin/stock/:id
pub async fn delete_stock(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let scope = session.scope();
    Repository::<StockItem>::new(state.store.as_ref(), &scope).delete_id(id).await?;
    Ok(ApiResponse::no_content())
}
