use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{commande_views, require_text, with_parties, CommandeView, ListParams, DEFAULT_ORDER, RECENT_LIMIT};
use crate::auth::Session;
use crate::database::models::{Client, ClientPatch, Commande, NewClient, OrderStatus};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CommercialOverview {
    pub total_commandes: u64,
    pub total_clients: u64,
    pub commandes_en_cours: u64,
    pub commandes_terminees: u64,
    pub recent_commandes: Vec<CommandeView>,
}

/// Filter on rows owned by the calling commercial
fn owned(mut filter: Filter, session: &Session) -> Result<Filter, ApiError> {
    filter.eq("commercial_id", session.user_id)?;
    Ok(filter)
}

/// GET /dashboard/commercial
pub async fn overview(State(state): State<AppState>, session: Session) -> ApiResult<CommercialOverview> {
    let scope = session.scope();
    let commandes = Repository::<Commande>::new(state.store.as_ref(), &scope);
    let clients = Repository::<Client>::new(state.store.as_ref(), &scope);

    let all = owned(commandes.filter(), &session)?;
    let own_clients = owned(clients.filter(), &session)?;
    let mut en_cours = all.clone();
    en_cours.eq("statut", OrderStatus::EnCours)?;
    let mut terminees = all.clone();
    terminees.eq("statut", OrderStatus::Termine)?;
    let mut recent = all.clone();
    with_parties(&mut recent)?.order(DEFAULT_ORDER)?.limit(RECENT_LIMIT)?;

    let (total_commandes, total_clients, commandes_en_cours, commandes_terminees, recent_commandes) = futures::try_join!(
        commandes.count(&all),
        clients.count(&own_clients),
        commandes.count(&en_cours),
        commandes.count(&terminees),
        commandes.select_any(&recent),
    )?;

    Ok(ApiResponse::success(CommercialOverview {
        total_commandes,
        total_clients,
        commandes_en_cours,
        commandes_terminees,
        recent_commandes: commande_views(recent_commandes),
    }))
}

/// GET /dashboard/commercial/clients
pub async fn list_clients(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Client>> {
    let scope = session.scope();
    let repo = Repository::<Client>::new(state.store.as_ref(), &scope);
    let mut filter = owned(repo.filter(), &session)?;
    filter.order(params.order_or(DEFAULT_ORDER))?;

    Ok(ApiResponse::success(repo.select_any(&filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub nom: String,
    pub entreprise: String,
    pub contact: String,
}

/// POST /dashboard/commercial/clients - the caller becomes the client's commercial
pub async fn create_client(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> ApiResult<NewClient> {
    let Json(payload) = payload?;
    require_text("nom", &payload.nom)?;
    require_text("entreprise", &payload.entreprise)?;
    require_text("contact", &payload.contact)?;

    let client = NewClient {
        nom: payload.nom.trim().to_string(),
        entreprise: payload.entreprise.trim().to_string(),
        contact: payload.contact.trim().to_string(),
        commercial_id: session.user_id,
    };

    let scope = session.scope();
    Repository::<Client>::new(state.store.as_ref(), &scope).insert(&client).await?;
    tracing::info!("Commercial {} added client {}", session.user_id, client.entreprise);
    Ok(ApiResponse::created(client))
}

/// Own client by id, or 404
async fn find_owned(repo: &Repository<'_, Client>, session: &Session, id: Uuid) -> Result<Filter, ApiError> {
    let mut filter = owned(repo.filter(), session)?;
    filter.eq("id", id)?;
    match repo.select_one(&filter).await? {
        Some(_) => Ok(filter),
        None => Err(ApiError::not_found(format!("Client {} not found", id))),
    }
}

/// PUT /dashboard/commercial/clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    payload: Result<Json<ClientPatch>, JsonRejection>,
) -> ApiResult<()> {
    let Json(patch) = payload?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    for (field, value) in [("nom", &patch.nom), ("entreprise", &patch.entreprise), ("contact", &patch.contact)] {
        if let Some(value) = value {
            require_text(field, value)?;
        }
    }

    let scope = session.scope();
    let repo = Repository::<Client>::new(state.store.as_ref(), &scope);
    let filter = find_owned(&repo, &session, id).await?;
    repo.update_all(&filter, &patch).await?;
    Ok(ApiResponse::no_content())
}

/// DELETE /dashboard/commercial/clients/:id
pub async fn delete_client(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let scope = session.scope();
    let repo = Repository::<Client>::new(state.store.as_ref(), &scope);
    let filter = find_owned(&repo, &session, id).await?;
    repo.delete_all(&filter).await?;
    tracing::info!("Commercial {} removed client {}", session.user_id, id);
    Ok(ApiResponse::no_content())
}

/// GET /dashboard/commercial/commandes
pub async fn list_commandes(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<CommandeView>> {
    let scope = session.scope();
    let repo = Repository::<Commande>::new(state.store.as_ref(), &scope);
    let mut filter = owned(repo.filter(), &session)?;
    with_parties(&mut filter)?.order(params.order_or(DEFAULT_ORDER))?;

    Ok(ApiResponse::success(commande_views(repo.select_any(&filter).await?)))
}
