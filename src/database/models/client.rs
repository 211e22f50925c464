use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{decode_row, Model};
use crate::database::store::{StoreError, Table};

/// Customer company followed by a commercial
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub nom: String,
    pub entreprise: String,
    pub commercial_id: Uuid,
    /// Contact email, also used to link a client account to its record
    pub contact: String,
    pub created_at: DateTime<Utc>,
}

impl Model for Client {
    const TABLE: Table = Table::Clients;

    fn from_row(row: Value) -> Result<Self, StoreError> {
        decode_row(Self::TABLE, row)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub nom: String,
    pub entreprise: String,
    pub contact: String,
    pub commercial_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entreprise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self.nom.is_none() && self.entreprise.is_none() && self.contact.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_from_row() {
        let client = Client::from_row(json!({
            "id": "6f1c2a7e-3b1d-4c55-9a9e-0a6c1f0e2b11",
            "nom": "Durand",
            "entreprise": "Durand SARL",
            "commercial_id": "0b7d6a3c-8f1e-4a2b-9c3d-4e5f6a7b8c9d",
            "contact": "durand@example.com",
            "created_at": "2024-04-02T08:30:00+00:00"
        }))
        .unwrap();
        assert_eq!(client.entreprise, "Durand SARL");
    }

    #[test]
    fn test_client_missing_field_is_invalid() {
        let err = Client::from_row(json!({"id": "6f1c2a7e-3b1d-4c55-9a9e-0a6c1f0e2b11"})).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow { table: Table::Clients, .. }));
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = ClientPatch { contact: Some("new@example.com".into()), ..Default::default() };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"contact": "new@example.com"}));
        assert!(ClientPatch::default().is_empty());
    }
}
