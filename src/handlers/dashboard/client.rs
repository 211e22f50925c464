use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{commande_views, require_text, CommandeView, DEFAULT_ORDER};
use crate::auth::Session;
use crate::database::models::{Client, Commande, NewCommande, OrderStatus, Profile};
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ClientStats {
    pub total: usize,
    pub en_attente: usize,
    pub en_cours: usize,
    pub terminees: usize,
}

impl ClientStats {
    pub fn from_commandes(commandes: &[Commande]) -> Self {
        let count = |pred: fn(&OrderStatus) -> bool| commandes.iter().filter(|c| pred(&c.statut)).count();
        Self {
            total: commandes.len(),
            en_attente: count(|s| *s == OrderStatus::EnAttente),
            en_cours: count(|s| *s == OrderStatus::EnCours),
            terminees: count(OrderStatus::is_finished),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientOverview {
    pub client: Option<Client>,
    pub stats: ClientStats,
    pub commandes: Vec<CommandeView>,
}

/// Email used to link the caller to a client record: profile first, then token
fn caller_email(profile: Option<&Profile>, session: &Session) -> Option<String> {
    profile
        .map(|p| p.email.clone())
        .filter(|e| !e.trim().is_empty())
        .or_else(|| session.email.clone())
}

async fn find_client(state: &AppState, session: &Session, profile: Option<&Profile>) -> Result<Option<Client>, ApiError> {
    let Some(email) = caller_email(profile, session) else {
        return Ok(None);
    };
    let scope = session.scope();
    let repo = Repository::<Client>::new(state.store.as_ref(), &scope);
    let mut filter = repo.filter();
    filter.eq("contact", email)?;
    Ok(repo.select_one(&filter).await?)
}

/// GET /dashboard/client - the caller's orders, or an empty view when no client record matches
pub async fn overview(
    State(state): State<AppState>,
    session: Session,
    profile: Option<Extension<Profile>>,
) -> ApiResult<ClientOverview> {
    let profile = profile.map(|Extension(p)| p);
    let Some(client) = find_client(&state, &session, profile.as_ref()).await? else {
        tracing::debug!("No client record linked to user {}", session.user_id);
        return Ok(ApiResponse::success(ClientOverview {
            client: None,
            stats: ClientStats::default(),
            commandes: vec![],
        }));
    };

    let scope = session.scope();
    let repo = Repository::<Commande>::new(state.store.as_ref(), &scope);
    let mut filter = repo.filter();
    filter.eq("client_id", client.id)?.order(DEFAULT_ORDER)?;
    let commandes = repo.select_any(&filter).await?;

    Ok(ApiResponse::success(ClientOverview {
        client: Some(client),
        stats: ClientStats::from_commandes(&commandes),
        commandes: commande_views(commandes),
    }))
}

#[derive(Debug, Deserialize)]
pub struct NouvelleCommandeRequest {
    pub produit: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantite: i32,
    pub date_livraison: NaiveDate,
}

impl NouvelleCommandeRequest {
    /// Product label as stored: the product, then ` - <description>` when one is given
    pub fn produit_label(&self) -> String {
        let produit = self.produit.trim();
        match self.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(description) => format!("{} - {}", produit, description),
            None => produit.to_string(),
        }
    }
}

/// POST /dashboard/client/nouvelle-commande
pub async fn nouvelle_commande(
    State(state): State<AppState>,
    session: Session,
    profile: Option<Extension<Profile>>,
    payload: Result<Json<NouvelleCommandeRequest>, JsonRejection>,
) -> ApiResult<NewCommande> {
    let Json(payload) = payload?;
    require_text("produit", &payload.produit)?;
    if payload.quantite <= 0 {
        return Err(ApiError::field_error("quantite", "Quantity must be positive"));
    }

    let profile = profile.map(|Extension(p)| p);
    let client = find_client(&state, &session, profile.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("No client record is linked to this account"))?;

    let commande = NewCommande {
        reference: NewCommande::reference_at(Utc::now()),
        client_id: client.id,
        commercial_id: client.commercial_id,
        produit: payload.produit_label(),
        quantite: payload.quantite,
        statut: OrderStatus::EnAttente,
        date_livraison: payload.date_livraison,
    };

    let scope = session.scope();
    Repository::<Commande>::new(state.store.as_ref(), &scope).insert(&commande).await?;
    tracing::info!("Client {} placed order {}", client.id, commande.reference);
    Ok(ApiResponse::created(commande))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn commande(statut: OrderStatus) -> Commande {
        Commande {
            id: Uuid::new_v4(),
            reference: "CMD-1".into(),
            client_id: Uuid::new_v4(),
            commercial_id: Uuid::new_v4(),
            produit: "Kakemono".into(),
            quantite: 1,
            statut,
            date_livraison: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            created_at: Utc::now(),
            clients: None,
            commercial: None,
        }
    }

    #[test]
    fn test_stats_count_delivered_as_finished() {
        let commandes = vec![
            commande(OrderStatus::EnAttente),
            commande(OrderStatus::EnCours),
            commande(OrderStatus::Termine),
            commande(OrderStatus::Livre),
        ];
        assert_eq!(
            ClientStats::from_commandes(&commandes),
            ClientStats { total: 4, en_attente: 1, en_cours: 1, terminees: 2 }
        );
    }

    #[test]
    fn test_description_is_appended_to_product() {
        let request = |description: Option<&str>| NouvelleCommandeRequest {
            produit: " Totem ".into(),
            description: description.map(str::to_string),
            quantite: 1,
            date_livraison: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        };
        assert_eq!(request(Some("rouge, 2m")).produit_label(), "Totem - rouge, 2m");
        assert_eq!(request(Some("  ")).produit_label(), "Totem");
        assert_eq!(request(None).produit_label(), "Totem");
    }

    #[test]
    fn test_caller_email_falls_back_to_token() {
        let session = Session {
            user_id: Uuid::new_v4(),
            email: Some("token@example.com".into()),
            expires_at: Utc::now(),
            access_token: "t".into(),
        };
        assert_eq!(caller_email(None, &session).as_deref(), Some("token@example.com"));
    }
}
