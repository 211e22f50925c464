use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::filter::{Filter, FilterError};

/// Errors from the hosted data store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Data store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Data store unreachable: {0}")]
    Transport(String),

    #[error("Failed to decode data store response: {0}")]
    Decode(String),

    #[error("Failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid row in '{table}': {message}")]
    InvalidRow { table: Table, message: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Tables exposed by the hosted data API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Clients,
    Commandes,
    Stock,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Clients => "clients",
            Table::Commandes => "commandes",
            Table::Stock => "stock",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a data store call is made on behalf of. Row-level security in the
/// store decides what the caller may see; it is not re-implemented here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Anonymous,
    User { access_token: String },
}

impl Scope {
    pub fn user(access_token: impl Into<String>) -> Self {
        Scope::User { access_token: access_token.into() }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            Scope::Anonymous => None,
            Scope::User { access_token } => Some(access_token),
        }
    }
}

/// Generic query interface of the hosted data store
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, scope: &Scope, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, scope: &Scope, filter: &Filter) -> Result<u64, StoreError>;

    async fn insert(&self, scope: &Scope, table: Table, row: Value) -> Result<(), StoreError>;

    /// Returns how many rows the patch reached; 0 when the filter matched nothing
    /// visible to the caller
    async fn update(&self, scope: &Scope, filter: &Filter, patch: Value) -> Result<u64, StoreError>;

    async fn delete(&self, scope: &Scope, filter: &Filter) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
