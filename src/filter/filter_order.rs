use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `"created_at desc, nom"` into ordering terms
    pub fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                Filter::validate_column(col)?;
                let sort = match it.next() {
                    None => SortDirection::Asc,
                    Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                    Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                    Some(dir) => return Err(FilterError::InvalidOrder(format!("unknown direction '{}'", dir))),
                };
                if it.next().is_some() {
                    return Err(FilterError::InvalidOrder(trimmed.to_string()));
                }
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        Ok(out)
    }

    /// PostgREST `order` parameter, e.g. `created_at.desc,nom.asc`
    pub fn generate(infos: &[FilterOrderInfo]) -> Option<String> {
        if infos.is_empty() { return None; }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{}.{}", i.column, i.sort.to_param()))
            .collect();
        Some(parts.join(","))
    }

    /// Compare two rows by the ordering terms, used by in-memory stores
    pub fn compare(infos: &[FilterOrderInfo], a: &Value, b: &Value) -> Ordering {
        for info in infos {
            let (x, y) = (a.get(&info.column), b.get(&info.column));
            // Nulls and missing values sort last in either direction
            let ord = match (is_null(x), is_null(y)) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => match info.sort {
                    SortDirection::Asc => compare_values(x, y),
                    SortDirection::Desc => compare_values(x, y).reverse(),
                },
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        _ => Ordering::Equal,
    }
}

fn is_null(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_order_string() {
        let infos = FilterOrder::parse_order_string("created_at desc, nom").unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].sort, SortDirection::Desc);
        assert_eq!(infos[1].column, "nom");
        assert_eq!(infos[1].sort, SortDirection::Asc);
        assert_eq!(FilterOrder::generate(&infos).as_deref(), Some("created_at.desc,nom.asc"));
    }

    #[test]
    fn test_parse_order_rejects_garbage() {
        assert!(FilterOrder::parse_order_string("nom sideways").is_err());
        assert!(FilterOrder::parse_order_string("nom; drop").is_err());
        assert!(FilterOrder::parse_order_string("nom asc extra").is_err());
    }

    #[test]
    fn test_compare_desc_with_nulls_last() {
        let infos = FilterOrder::parse_order_string("quantite desc").unwrap();
        let mut rows = vec![json!({"quantite": 1}), json!({"quantite": null}), json!({"quantite": 5})];
        rows.sort_by(|a, b| FilterOrder::compare(&infos, a, b));
        assert_eq!(rows[0]["quantite"], json!(5));
        assert_eq!(rows[1]["quantite"], json!(1));
    }
}
