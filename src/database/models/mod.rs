pub mod client;
pub mod commande;
pub mod profile;
pub mod stock;

pub use client::{Client, ClientPatch, NewClient};
pub use commande::{ClientSummary, Commande, CommercialSummary, NewCommande, OrderStatus};
pub use profile::{Profile, ProfileError};
pub use stock::{NewStockItem, StockItem};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::store::{StoreError, Table};

/// A typed record of one table, validated when it crosses in from the store
pub trait Model: Sized {
    const TABLE: Table;

    fn from_row(row: Value) -> Result<Self, StoreError>;
}

/// Default boundary check: the row must deserialize into the record type
pub(crate) fn decode_row<T: DeserializeOwned>(table: Table, row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::InvalidRow {
        table,
        message: e.to_string(),
    })
}
