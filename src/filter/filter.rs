use std::fmt::Display;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{FilterEmbedInfo, FilterOrderInfo, FilterWhereInfo};
use crate::database::Table;

/// Upper bound applied to any requested limit
pub const MAX_LIMIT: u32 = 1000;

/// Query description understood by every data store: table, projection,
/// equality conditions, ordering and limit.
#[derive(Debug, Clone)]
pub struct Filter {
    table: Table,
    select_columns: Vec<String>,
    embed_data: Vec<FilterEmbedInfo>,
    where_data: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<u32>,
}

impl Filter {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            select_columns: vec![],
            embed_data: vec![],
            where_data: vec![],
            order_data: vec![],
            limit: None,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn select(&mut self, columns: &[&str]) -> Result<&mut Self, FilterError> {
        for column in columns {
            if *column != "*" {
                Self::validate_column(column)?;
            }
        }
        self.select_columns = columns.iter().map(|c| c.to_string()).collect();
        Ok(self)
    }

    /// Pull the row referenced by `foreign_key` from `table` into each result,
    /// under `alias`, restricted to `columns`
    pub fn embed(
        &mut self,
        alias: &str,
        table: Table,
        foreign_key: &str,
        columns: &[&str],
    ) -> Result<&mut Self, FilterError> {
        Self::validate_column(alias)?;
        Self::validate_column(foreign_key)?;
        if columns.is_empty() {
            return Err(FilterError::InvalidColumn(format!("Embedded '{}' selects no columns", alias)));
        }
        for column in columns {
            Self::validate_column(column)?;
        }
        self.embed_data.push(FilterEmbedInfo {
            alias: alias.to_string(),
            table,
            foreign_key: foreign_key.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        Ok(self)
    }

    /// Add an equality condition (`column = value`)
    pub fn eq(&mut self, column: &str, value: impl Display) -> Result<&mut Self, FilterError> {
        Self::validate_column(column)?;
        self.where_data.push(FilterWhereInfo {
            column: column.to_string(),
            value: value.to_string(),
        });
        Ok(self)
    }

    /// Set ordering from a string such as `"created_at desc"`
    pub fn order(&mut self, order_spec: &str) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::parse_order_string(order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: u32) -> Result<&mut Self, FilterError> {
        if limit == 0 {
            return Err(FilterError::InvalidLimit("Limit must be positive".to_string()));
        }
        if limit > MAX_LIMIT {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, MAX_LIMIT);
        }
        self.limit = Some(limit.min(MAX_LIMIT));
        Ok(self)
    }

    pub fn conditions(&self) -> &[FilterWhereInfo] {
        &self.where_data
    }

    pub fn embeds(&self) -> &[FilterEmbedInfo] {
        &self.embed_data
    }

    /// PostgREST query parameters for a read
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.build_select_clause())];
        pairs.extend(self.to_where_pairs());
        if let Some(order) = FilterOrder::generate(&self.order_data) {
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    /// PostgREST query parameters carrying only the conditions (update, delete, count)
    pub fn to_where_pairs(&self) -> Vec<(String, String)> {
        self.where_data
            .iter()
            .map(|w| (w.column.clone(), format!("eq.{}", w.value)))
            .collect()
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.where_data.iter().all(|w| w.matches(row))
    }

    /// Evaluate the filter against in-memory rows
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
        let mut matched: Vec<&Value> = rows.into_iter().filter(|row| self.matches(row)).collect();
        matched.sort_by(|a, b| FilterOrder::compare(&self.order_data, a, b));
        let limit = self.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        matched.into_iter().take(limit).map(|row| self.project(row)).collect()
    }

    fn project(&self, row: &Value) -> Value {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            return row.clone();
        }
        let mut out = Map::new();
        for column in &self.select_columns {
            if let Some(v) = row.get(column) {
                out.insert(column.clone(), v.clone());
            }
        }
        Value::Object(out)
    }

    pub(crate) fn validate_column(column: &str) -> Result<(), FilterError> {
        let mut chars = column.chars();
        let valid = match chars.next() {
            Some(first) => (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
            None => false,
        };
        if !valid {
            return Err(FilterError::InvalidColumn(format!("Invalid column name format: '{}'", column)));
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        let mut parts = if self.select_columns.is_empty() {
            vec!["*".to_string()]
        } else {
            self.select_columns.clone()
        };
        for embed in &self.embed_data {
            parts.push(format!(
                "{}:{}!{}_{}_fkey({})",
                embed.alias,
                embed.table,
                self.table,
                embed.foreign_key,
                embed.columns.join(",")
            ));
        }
        parts.join(",")
    }
}
