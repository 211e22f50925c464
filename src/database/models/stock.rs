use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{decode_row, Model};
use crate::database::store::{StoreError, Table};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockItem {
    pub id: Uuid,
    pub nom: String,
    pub quantite: i32,
    pub unite: String,
    pub updated_at: DateTime<Utc>,
}

impl Model for StockItem {
    const TABLE: Table = Table::Stock;

    fn from_row(row: Value) -> Result<Self, StoreError> {
        decode_row(Self::TABLE, row)
    }
}

/// Body for creating or replacing a stock line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockItem {
    pub nom: String,
    pub quantite: i32,
    pub unite: String,
}

impl NewStockItem {
    pub fn validate(&self) -> Result<(), String> {
        if self.nom.trim().is_empty() {
            return Err("nom is required".to_string());
        }
        if self.unite.trim().is_empty() {
            return Err("unite is required".to_string());
        }
        if self.quantite < 0 {
            return Err("quantite cannot be negative".to_string());
        }
        Ok(())
    }
}
