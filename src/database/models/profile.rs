use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::Model;
use crate::database::store::{StoreError, Table};
use crate::policy::{Role, RoleSet};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile has no role")]
    NoRole,
    #[error("profile carries both 'role' and 'roles' and they disagree")]
    ConflictingRoles,
}

/// Per-user record keyed by the auth subject id.
///
/// Two row shapes exist in deployed databases: a single `role` column and a
/// `roles` array column. Both are accepted here and normalized to a non-empty
/// [`RoleSet`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub roles: RoleSet,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: Uuid,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    roles: Option<Vec<Role>>,
    #[serde(default)]
    nom: String,
    #[serde(default)]
    prenom: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    created_by: Option<Uuid>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl ProfileRow {
    fn role_set(&self) -> Result<RoleSet, ProfileError> {
        let from_list = self.roles.as_ref().and_then(|r| RoleSet::new(r.iter().copied()));
        match (self.role, from_list) {
            (Some(single), Some(set)) if !set.contains(single) => Err(ProfileError::ConflictingRoles),
            (_, Some(set)) => Ok(set),
            (Some(single), None) => Ok(RoleSet::single(single)),
            (None, None) => Err(ProfileError::NoRole),
        }
    }
}

impl Profile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom).trim().to_string()
    }
}

impl Model for Profile {
    const TABLE: Table = Table::Profiles;

    fn from_row(row: Value) -> Result<Self, StoreError> {
        let invalid = |message: String| StoreError::InvalidRow { table: Self::TABLE, message };

        let row: ProfileRow = serde_json::from_value(row).map_err(|e| invalid(e.to_string()))?;
        let roles = row.role_set().map_err(|e| invalid(e.to_string()))?;

        Ok(Profile {
            id: row.id,
            roles,
            nom: row.nom,
            prenom: row.prenom,
            email: row.email,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "0b7d6a3c-8f1e-4a2b-9c3d-4e5f6a7b8c9d";

    #[test]
    fn test_single_role_schema() {
        let profile = Profile::from_row(json!({
            "id": ID,
            "role": "commercial",
            "nom": "Martin",
            "prenom": "Léa",
            "email": "lea@example.com",
            "created_by": null,
            "created_at": "2024-01-10T12:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(profile.roles, RoleSet::single(Role::Commercial));
        assert_eq!(profile.display_name(), "Léa Martin");
    }

    #[test]
    fn test_multi_role_schema() {
        let profile = Profile::from_row(json!({
            "id": ID,
            "roles": ["client", "admin"],
            "email": "boss@example.com"
        }))
        .unwrap();
        assert_eq!(profile.roles.canonical(), Role::Admin);
        assert!(profile.roles.contains(Role::Client));
    }

    #[test]
    fn test_missing_or_empty_roles_are_invalid() {
        assert!(Profile::from_row(json!({"id": ID})).is_err());
        assert!(Profile::from_row(json!({"id": ID, "roles": []})).is_err());
        assert!(Profile::from_row(json!({"id": ID, "role": null, "roles": null})).is_err());
    }

    #[test]
    fn test_unknown_role_is_invalid() {
        let err = Profile::from_row(json!({"id": ID, "role": "superuser"})).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow { table: Table::Profiles, .. }));
    }

    #[test]
    fn test_conflicting_schemas() {
        assert!(Profile::from_row(json!({"id": ID, "role": "admin", "roles": ["client"]})).is_err());
        let profile = Profile::from_row(json!({"id": ID, "role": "client", "roles": ["client", "commercial"]})).unwrap();
        assert_eq!(profile.roles.canonical(), Role::Commercial);
    }
}
