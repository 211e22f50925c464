use serde_json::Value;

use crate::database::Table;

/// Equality condition on one column
#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub value: String,
}

impl FilterWhereInfo {
    /// Whether a JSON row satisfies this condition
    pub fn matches(&self, row: &Value) -> bool {
        row.get(&self.column)
            .map(|v| render_value(v) == self.value)
            .unwrap_or(false)
    }
}

/// Related row joined through a foreign key column of the filtered table
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEmbedInfo {
    pub alias: String,
    pub table: Table,
    pub foreign_key: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_param(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// Render a JSON scalar the way the REST API expects it in a query string
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
