use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::store::{DataStore, Scope, StoreError, Table};
use crate::config::BackendConfig;
use crate::filter::Filter;

/// HTTP client for the hosted PostgREST data API.
///
/// Built once at startup and shared; every call carries the caller's scope
/// so that row-level security applies to the caller, not to this service.
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    rest_url: Url,
    anon_key: String,
}

impl PostgrestClient {
    pub fn new(config: &BackendConfig) -> Result<Self, StoreError> {
        let base = Url::parse(&config.url)
            .map_err(|e| StoreError::Transport(format!("invalid backend URL '{}': {}", config.url, e)))?;
        let rest_url = base
            .join("rest/v1/")
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            rest_url,
            anon_key: config.anon_key.clone(),
        })
    }

    fn table_url(&self, table: Table) -> Result<Url, StoreError> {
        self.rest_url
            .join(table.as_str())
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    fn request(&self, method: Method, scope: &Scope, table: Table) -> Result<RequestBuilder, StoreError> {
        let bearer = scope.access_token().unwrap_or(&self.anon_key);
        Ok(self
            .http
            .request(method, self.table_url(table)?)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer))
    }

    /// Turn non-2xx responses into `StoreError::Rejected` with the API's message
    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        Err(StoreError::Rejected { status: status.as_u16(), message })
    }
}

/// Parse the total out of a `Content-Range` header such as `0-24/57` or `*/0`
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().split_once('/')?;
    total.parse().ok()
}

#[async_trait]
impl DataStore for PostgrestClient {
    async fn select(&self, scope: &Scope, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        debug!("select from {}", filter.table());
        let response = self
            .request(Method::GET, scope, filter.table())?
            .query(&filter.to_query_pairs())
            .send()
            .await?;
        let rows = Self::check(response).await?.json::<Vec<Value>>().await?;
        Ok(rows)
    }

    async fn count(&self, scope: &Scope, filter: &Filter) -> Result<u64, StoreError> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(filter.to_where_pairs());

        let response = self
            .request(Method::HEAD, scope, filter.table())?
            .header("Prefer", "count=exact")
            .query(&pairs)
            .send()
            .await?;
        let response = Self::check(response).await?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| StoreError::Decode(format!("missing or invalid Content-Range counting {}", filter.table())))
    }

    async fn insert(&self, scope: &Scope, table: Table, row: Value) -> Result<(), StoreError> {
        debug!("insert into {}", table);
        let response = self
            .request(Method::POST, scope, table)?
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, scope: &Scope, filter: &Filter, patch: Value) -> Result<u64, StoreError> {
        debug!("update {}", filter.table());
        let mut pairs = vec![("select".to_string(), "id".to_string())];
        pairs.extend(filter.to_where_pairs());

        let response = self
            .request(Method::PATCH, scope, filter.table())?
            .header("Prefer", "return=representation")
            .query(&pairs)
            .json(&patch)
            .send()
            .await?;
        let updated = Self::check(response).await?.json::<Vec<Value>>().await?;
        Ok(updated.len() as u64)
    }

    async fn delete(&self, scope: &Scope, filter: &Filter) -> Result<(), StoreError> {
        debug!("delete from {}", filter.table());
        let response = self
            .request(Method::DELETE, scope, filter.table())?
            .query(&filter.to_where_pairs())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let response = self
            .http
            .get(self.rest_url.clone())
            .header("apikey", &self.anon_key)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/57"), Some(57));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_table_urls() {
        let mut config = AppConfig::development().backend;
        config.url = "https://project.supabase.co".to_string();
        let client = PostgrestClient::new(&config).unwrap();
        assert_eq!(
            client.table_url(Table::Commandes).unwrap().as_str(),
            "https://project.supabase.co/rest/v1/commandes"
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let mut config = AppConfig::development().backend;
        config.url = "::nope".to_string();
        assert!(PostgrestClient::new(&config).is_err());
    }
}
