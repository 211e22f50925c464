use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{Badge, BadgeVariant, Badged};

/// Closed set of application roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Commercial,
    Client,
}

impl Role {
    /// Redirect priority, highest first
    pub const PRIORITY: [Role; 3] = [Role::Admin, Role::Commercial, Role::Client];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Commercial => "commercial",
            Role::Client => "client",
        }
    }

    /// Canonical landing route for this role
    pub fn root_path(&self) -> String {
        format!("/dashboard/{}", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "commercial" => Ok(Role::Commercial),
            "client" => Ok(Role::Client),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl Badged for Role {
    fn badge(&self) -> Badge {
        match self {
            Role::Admin => Badge::new("Admin", BadgeVariant::Secondary, "bg-red-100 text-red-800"),
            Role::Commercial => Badge::new("Commercial", BadgeVariant::Secondary, "bg-blue-100 text-blue-800"),
            Role::Client => Badge::new("Client", BadgeVariant::Secondary, "bg-green-100 text-green-800"),
        }
    }
}

/// Non-empty, deduplicated set of roles held by one profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<Role>")]
pub struct RoleSet {
    // Kept sorted by priority so iteration and serialization are stable
    roles: Vec<Role>,
}

impl RoleSet {
    pub fn single(role: Role) -> Self {
        Self { roles: vec![role] }
    }

    /// Returns `None` when no role is given
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Option<Self> {
        let mut roles: Vec<Role> = roles.into_iter().collect();
        roles.sort();
        roles.dedup();
        if roles.is_empty() {
            None
        } else {
            Some(Self { roles })
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Highest-priority role, used only to pick redirect targets
    pub fn canonical(&self) -> Role {
        // Invariant: non-empty and sorted by priority
        self.roles[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    pub fn badges(&self) -> Vec<Badge> {
        self.iter().map(|r| r.badge()).collect()
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.roles
    }
}
