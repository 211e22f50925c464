pub mod admin;
pub mod client;
pub mod commercial;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::models::{Commande, Profile};
use crate::database::Table;
use crate::error::ApiError;
use crate::filter::{Filter, FilterError};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::{Badge, Badged};

/// Orders are listed newest first unless the caller asks otherwise
pub const DEFAULT_ORDER: &str = "created_at desc";
pub const RECENT_LIMIT: u32 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub order: Option<String>,
}

impl ListParams {
    pub fn order_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.order.as_deref().filter(|o| !o.trim().is_empty()).unwrap_or(default)
    }
}

#[derive(Debug, Serialize)]
pub struct CommandeView {
    #[serde(flatten)]
    pub commande: Commande,
    pub badge: Badge,
}

impl From<Commande> for CommandeView {
    fn from(commande: Commande) -> Self {
        let badge = commande.statut.badge();
        Self { commande, badge }
    }
}

/// Embed the client and the commercial behind each order
pub fn with_parties(filter: &mut Filter) -> Result<&mut Filter, FilterError> {
    filter
        .embed("clients", Table::Clients, "client_id", &["nom", "entreprise"])?
        .embed("commercial", Table::Profiles, "commercial_id", &["nom", "prenom"])
}

pub fn commande_views(commandes: Vec<Commande>) -> Vec<CommandeView> {
    commandes.into_iter().map(CommandeView::from).collect()
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub display_name: String,
    pub badges: Vec<Badge>,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        Self {
            display_name: profile.display_name(),
            badges: profile.roles.badges(),
            profile,
        }
    }
}

/// `GET /dashboard`, only reached while the caller's profile is not provisioned
pub async fn waiting_page() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "status": "profile_pending",
        "message": "Votre profil est en cours de création. Réessayez dans quelques instants.",
    })))
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::field_error(field, "This field is required"));
    }
    Ok(())
}
