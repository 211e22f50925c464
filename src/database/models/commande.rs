use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{decode_row, Model};
use crate::database::store::{StoreError, Table};
use crate::types::{Badge, BadgeVariant, Badged};

/// Lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    EnAttente,
    EnCours,
    Termine,
    Livre,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::EnAttente => "en_attente",
            OrderStatus::EnCours => "en_cours",
            OrderStatus::Termine => "termine",
            OrderStatus::Livre => "livre",
        }
    }

    /// Finished from the customer's point of view
    pub fn is_finished(&self) -> bool {
        matches!(self, OrderStatus::Termine | OrderStatus::Livre)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Badged for OrderStatus {
    fn badge(&self) -> Badge {
        match self {
            OrderStatus::EnAttente => Badge::new("En attente", BadgeVariant::Secondary, "bg-yellow-100 text-yellow-800"),
            OrderStatus::EnCours => Badge::new("En cours", BadgeVariant::Default, "bg-blue-100 text-blue-800"),
            OrderStatus::Termine => Badge::new("Terminé", BadgeVariant::Outline, "bg-green-100 text-green-800"),
            OrderStatus::Livre => Badge::new("Livré", BadgeVariant::Default, "bg-purple-100 text-purple-800"),
        }
    }
}

/// Client fields carried along with an order in listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSummary {
    pub nom: String,
    pub entreprise: String,
}

/// Commercial fields carried along with an order in listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommercialSummary {
    pub nom: String,
    pub prenom: String,
}

/// Order of display material placed for a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Commande {
    pub id: Uuid,
    pub reference: String,
    pub client_id: Uuid,
    pub commercial_id: Uuid,
    pub produit: String,
    pub quantite: i32,
    #[serde(default)]
    pub statut: OrderStatus,
    pub date_livraison: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clients: Option<ClientSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commercial: Option<CommercialSummary>,
}

impl Model for Commande {
    const TABLE: Table = Table::Commandes;

    fn from_row(row: Value) -> Result<Self, StoreError> {
        decode_row(Self::TABLE, row)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommande {
    pub reference: String,
    pub client_id: Uuid,
    pub commercial_id: Uuid,
    pub produit: String,
    pub quantite: i32,
    pub statut: OrderStatus,
    pub date_livraison: NaiveDate,
}

impl NewCommande {
    /// Reference in the `CMD-<unix millis>` form used across the application
    pub fn reference_at(now: DateTime<Utc>) -> String {
        format!("CMD-{}", now.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row() -> Value {
        json!({
            "id": "11111111-2222-4333-8444-555555555555",
            "reference": "CMD-1714000000000",
            "client_id": "6f1c2a7e-3b1d-4c55-9a9e-0a6c1f0e2b11",
            "commercial_id": "0b7d6a3c-8f1e-4a2b-9c3d-4e5f6a7b8c9d",
            "produit": "Présentoir comptoir",
            "quantite": 20,
            "statut": "en_cours",
            "date_livraison": "2024-06-15",
            "created_at": "2024-04-25T09:00:00.123456+00:00"
        })
    }

    #[test]
    fn test_commande_from_row() {
        let commande = Commande::from_row(row()).unwrap();
        assert_eq!(commande.statut, OrderStatus::EnCours);
        assert_eq!(commande.date_livraison, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn test_embedded_parties() {
        let mut row = row();
        row["clients"] = json!({"nom": "Léa Martin", "entreprise": "Boulangerie Martin"});
        row["commercial"] = Value::Null;
        let commande = Commande::from_row(row).unwrap();
        assert_eq!(commande.clients.as_ref().map(|c| c.entreprise.as_str()), Some("Boulangerie Martin"));
        assert_eq!(commande.commercial, None);

        let plain = Commande::from_row(self::row()).unwrap();
        let out = serde_json::to_value(&plain).unwrap();
        assert!(out.get("clients").is_none());
    }

    #[test]
    fn test_missing_status_defaults_to_pending() {
        let mut row = row();
        row.as_object_mut().unwrap().remove("statut");
        assert_eq!(Commande::from_row(row).unwrap().statut, OrderStatus::EnAttente);
    }

    #[test]
    fn test_unknown_status_is_invalid() {
        let mut row = row();
        row["statut"] = json!("perdu");
        assert!(Commande::from_row(row).is_err());
    }

    #[test]
    fn test_status_badges_and_names() {
        assert_eq!(OrderStatus::Livre.badge().label, "Livré");
        assert_eq!(OrderStatus::EnAttente.badge().variant, BadgeVariant::Secondary);
        assert_eq!(serde_json::to_value(OrderStatus::EnAttente).unwrap(), json!("en_attente"));
        assert!(OrderStatus::Termine.is_finished());
        assert!(!OrderStatus::EnCours.is_finished());
    }

    #[test]
    fn test_reference_format() {
        let now = Utc.timestamp_millis_opt(1_714_000_000_123).unwrap();
        assert_eq!(NewCommande::reference_at(now), "CMD-1714000000123");
    }
}
