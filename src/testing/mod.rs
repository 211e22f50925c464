//! In-memory collaborators for tests.
//!
//! `MemoryStore` evaluates [`Filter`]s against JSON rows the same way the
//! hosted data API does (equality, ordering, limit). `MemoryIdentity` issues
//! real HS256 access tokens signed with the configured secret, so the access
//! middleware resolves sessions exactly as it does in production. Row-level
//! security is not emulated.

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::auth::{
    generate_jwt, AuthSession, Claims, IdentityError, IdentityProvider, IdentityUser, SignUpMetadata,
};
use crate::config::AppConfig;
use crate::database::{DataStore, Scope, StoreError, Table};
use crate::filter::Filter;
use crate::policy::Role;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-bytes-long";
pub const TEST_ANON_KEY: &str = "test-anon-key-0123456789";

/// Development config pointing at nothing, with test credentials filled in
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.backend.url = "http://127.0.0.1:9".to_string();
    config.backend.anon_key = TEST_ANON_KEY.to_string();
    config.backend.jwt_secret = TEST_JWT_SECRET.to_string();
    config
}

/// Timestamps in one fixed format so that string ordering is time ordering
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    failing: Mutex<HashSet<Table>>,
    unhealthy: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<Table, Vec<Value>>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every call touching `table` fail as if the store were unreachable
    pub fn fail_table(&self, table: Table) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).insert(table);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        *self.unhealthy.lock().unwrap_or_else(|e| e.into_inner()) = unhealthy;
    }

    fn guard(&self, table: Table) -> Result<(), StoreError> {
        if self.failing.lock().unwrap_or_else(|e| e.into_inner()).contains(&table) {
            return Err(StoreError::Transport(format!("{} is unavailable", table)));
        }
        Ok(())
    }

    /// Insert a row as-is, without defaults
    pub fn seed(&self, table: Table, row: Value) {
        self.tables().entry(table).or_default().push(row);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables().get(&table).cloned().unwrap_or_default()
    }

    pub fn seed_profile(&self, id: Uuid, role: Role, email: &str) {
        self.seed(
            Table::Profiles,
            json!({
                "id": id,
                "role": role,
                "nom": "Test",
                "prenom": role.as_str(),
                "email": email,
                "created_by": null,
                "created_at": timestamp(),
            }),
        );
    }

    pub fn seed_client(&self, commercial_id: Uuid, entreprise: &str, contact: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.seed(
            Table::Clients,
            json!({
                "id": id,
                "nom": entreprise,
                "entreprise": entreprise,
                "commercial_id": commercial_id,
                "contact": contact,
                "created_at": timestamp(),
            }),
        );
        id
    }

    pub fn seed_commande(&self, client_id: Uuid, commercial_id: Uuid, statut: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.seed(
            Table::Commandes,
            json!({
                "id": id,
                "reference": format!("CMD-{}", Utc::now().timestamp_millis()),
                "client_id": client_id,
                "commercial_id": commercial_id,
                "produit": "Présentoir de sol",
                "quantite": 10,
                "statut": statut,
                "date_livraison": "2025-03-01",
                "created_at": timestamp(),
            }),
        );
        id
    }
}

/// Resolve a filter's embeds by looking up each row's foreign key in the related table
fn embed_related(tables: &HashMap<Table, Vec<Value>>, filter: &Filter, rows: &mut [Value]) {
    for embed in filter.embeds() {
        let related = tables.get(&embed.table).map(Vec::as_slice).unwrap_or_default();
        for row in rows.iter_mut() {
            let target = row
                .get(&embed.foreign_key)
                .and_then(|key| related.iter().find(|r| r.get("id") == Some(key)));
            let value = match target {
                Some(target) => Value::Object(
                    embed
                        .columns
                        .iter()
                        .filter_map(|c| target.get(c).map(|v| (c.clone(), v.clone())))
                        .collect(),
                ),
                None => Value::Null,
            };
            if let Some(fields) = row.as_object_mut() {
                fields.insert(embed.alias.clone(), value);
            }
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, _scope: &Scope, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.guard(filter.table())?;
        let tables = self.tables();
        let rows = tables.get(&filter.table()).map(Vec::as_slice).unwrap_or_default();
        let mut rows = filter.apply(rows);
        embed_related(&tables, filter, &mut rows);
        Ok(rows)
    }

    async fn count(&self, _scope: &Scope, filter: &Filter) -> Result<u64, StoreError> {
        self.guard(filter.table())?;
        let tables = self.tables();
        let rows = tables.get(&filter.table()).map(Vec::as_slice).unwrap_or_default();
        Ok(rows.iter().filter(|row| filter.matches(row)).count() as u64)
    }

    async fn insert(&self, _scope: &Scope, table: Table, mut row: Value) -> Result<(), StoreError> {
        self.guard(table)?;
        let Some(fields) = row.as_object_mut() else {
            return Err(StoreError::Rejected { status: 400, message: "row must be an object".into() });
        };
        fields.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
        let stamp_column = if table == Table::Stock { "updated_at" } else { "created_at" };
        fields.entry(stamp_column).or_insert_with(|| json!(timestamp()));

        self.tables().entry(table).or_default().push(row);
        Ok(())
    }

    async fn update(&self, _scope: &Scope, filter: &Filter, patch: Value) -> Result<u64, StoreError> {
        self.guard(filter.table())?;
        let Some(patch) = patch.as_object() else {
            return Err(StoreError::Rejected { status: 400, message: "patch must be an object".into() });
        };
        let mut tables = self.tables();
        let mut updated = 0;
        for row in tables.entry(filter.table()).or_default().iter_mut() {
            if !filter.matches(row) {
                continue;
            }
            if let Some(fields) = row.as_object_mut() {
                for (key, value) in patch {
                    fields.insert(key.clone(), value.clone());
                }
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete(&self, _scope: &Scope, filter: &Filter) -> Result<(), StoreError> {
        self.guard(filter.table())?;
        self.tables().entry(filter.table()).or_default().retain(|row| !filter.matches(row));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if *self.unhealthy.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

struct MemoryAccount {
    id: Uuid,
    password: String,
}

/// Password identity provider backed by a map of accounts
pub struct MemoryIdentity {
    secret: String,
    accounts: Mutex<HashMap<String, MemoryAccount>>,
    refresh_tokens: Mutex<HashMap<String, (Uuid, String)>>,
    store: Option<Arc<MemoryStore>>,
    signup_role: Option<Role>,
    signed_out: Mutex<Vec<String>>,
    sign_out_fails: bool,
}

impl MemoryIdentity {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            accounts: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            store: None,
            signup_role: None,
            signed_out: Mutex::new(Vec::new()),
            sign_out_fails: false,
        }
    }

    /// Provision a profile with `role` on every signup, like the backend's signup trigger
    pub fn provisioning(mut self, store: Arc<MemoryStore>, role: Role) -> Self {
        self.store = Some(store);
        self.signup_role = Some(role);
        self
    }

    pub fn failing_sign_out(mut self) -> Self {
        self.sign_out_fails = true;
        self
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, MemoryAccount>> {
        self.accounts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an account directly and return its id
    pub fn register(&self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.accounts().insert(email.to_string(), MemoryAccount { id, password: password.to_string() });
        id
    }

    /// Access token for a user, as the hosted auth service would issue it
    pub fn token_for(&self, user_id: Uuid, email: &str) -> String {
        let claims = Claims::new(user_id, Some(email.to_string()), Duration::hours(1));
        generate_jwt(&claims, &self.secret).unwrap_or_default()
    }

    /// Access token that expired an hour ago
    pub fn expired_token_for(&self, user_id: Uuid, email: &str) -> String {
        let claims = Claims::new(user_id, Some(email.to_string()), Duration::hours(-1));
        generate_jwt(&claims, &self.secret).unwrap_or_default()
    }

    /// Single-use refresh token for a user
    pub fn issue_refresh_token(&self, user_id: Uuid, email: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.refresh_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone(), (user_id, email.to_string()));
        token
    }

    fn session_for(&self, id: Uuid, email: &str) -> AuthSession {
        AuthSession {
            access_token: self.token_for(id, email),
            refresh_token: Some(self.issue_refresh_token(id, email)),
            expires_in: 3600,
            user: IdentityUser { id, email: Some(email.to_string()) },
        }
    }

    pub fn signed_out(&self) -> Vec<String> {
        self.signed_out.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let id = match self.accounts().get(email) {
            Some(account) if account.password == password => account.id,
            _ => return Err(IdentityError::InvalidCredentials),
        };
        Ok(self.session_for(id, email))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, IdentityError> {
        let issued = self
            .refresh_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(refresh_token);
        match issued {
            Some((id, email)) => Ok(self.session_for(id, &email)),
            None => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<IdentityUser, IdentityError> {
        if self.accounts().contains_key(email) {
            return Err(IdentityError::Rejected { status: 422, message: "User already registered".into() });
        }
        let id = self.register(email, password);

        if let (Some(store), Some(role)) = (&self.store, self.signup_role) {
            store.seed(
                Table::Profiles,
                json!({
                    "id": id,
                    "role": role,
                    "nom": metadata.nom,
                    "prenom": metadata.prenom,
                    "email": email,
                    "created_at": timestamp(),
                }),
            );
        }
        Ok(IdentityUser { id, email: Some(email.to_string()) })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        if self.sign_out_fails {
            return Err(IdentityError::Transport("auth service timed out".into()));
        }
        self.signed_out
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(access_token.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionResolver;

    #[tokio::test]
    async fn test_memory_store_filters_orders_and_limits() {
        let store = MemoryStore::new();
        let commercial = Uuid::new_v4();
        let other = Uuid::new_v4();
        let client = store.seed_client(commercial, "Boulangerie Martin", "martin@example.com");
        store.seed_commande(client, commercial, "en_cours");
        store.seed_commande(client, commercial, "termine");
        store.seed_commande(client, other, "en_cours");

        let mut filter = Filter::new(Table::Commandes);
        filter.eq("commercial_id", commercial).unwrap().order("created_at desc").unwrap();
        let rows = store.select(&Scope::Anonymous, &filter).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0]["created_at"].as_str() >= rows[1]["created_at"].as_str());

        filter.eq("statut", "en_cours").unwrap();
        assert_eq!(store.count(&Scope::Anonymous, &filter).await.unwrap(), 1);

        let mut limited = Filter::new(Table::Commandes);
        limited.limit(1).unwrap();
        assert_eq!(store.select(&Scope::Anonymous, &limited).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_insert_update_delete() {
        let store = MemoryStore::new();
        let scope = Scope::Anonymous;
        store
            .insert(&scope, Table::Stock, json!({"nom": "Kakemono", "quantite": 5, "unite": "unité"}))
            .await
            .unwrap();
        let row = store.rows(Table::Stock).remove(0);
        assert!(row["id"].is_string());
        assert!(row["updated_at"].is_string());

        let mut filter = Filter::new(Table::Stock);
        filter.eq("nom", "Kakemono").unwrap();
        assert_eq!(store.update(&scope, &filter, json!({"quantite": 7})).await.unwrap(), 1);
        assert_eq!(store.rows(Table::Stock)[0]["quantite"], 7);

        let mut missing = Filter::new(Table::Stock);
        missing.eq("nom", "Totem").unwrap();
        assert_eq!(store.update(&scope, &missing, json!({"quantite": 1})).await.unwrap(), 0);

        store.delete(&scope, &filter).await.unwrap();
        assert!(store.rows(Table::Stock).is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_resolves_embeds() {
        let store = MemoryStore::new();
        let commercial = Uuid::new_v4();
        store.seed_profile(commercial, Role::Commercial, "paul@example.com");
        let client = store.seed_client(commercial, "Boulangerie Martin", "martin@example.com");
        store.seed_commande(client, commercial, "en_cours");
        store.seed_commande(Uuid::new_v4(), commercial, "en_attente");

        let mut filter = Filter::new(Table::Commandes);
        filter
            .embed("clients", Table::Clients, "client_id", &["entreprise"]).unwrap()
            .embed("commercial", Table::Profiles, "commercial_id", &["nom", "prenom"]).unwrap();
        let rows = store.select(&Scope::Anonymous, &filter).await.unwrap();

        let linked = rows.iter().find(|r| r["client_id"] == json!(client)).unwrap();
        assert_eq!(linked["clients"], json!({"entreprise": "Boulangerie Martin"}));
        assert_eq!(linked["commercial"], json!({"nom": "Test", "prenom": "commercial"}));

        let dangling = rows.iter().find(|r| r["client_id"] != json!(client)).unwrap();
        assert!(dangling["clients"].is_null());
    }

    #[tokio::test]
    async fn test_failing_table() {
        let store = MemoryStore::new();
        store.fail_table(Table::Profiles);
        let filter = Filter::new(Table::Profiles);
        assert!(matches!(
            store.select(&Scope::Anonymous, &filter).await,
            Err(StoreError::Transport(_))
        ));
        assert!(store.select(&Scope::Anonymous, &Filter::new(Table::Stock)).await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_identity_tokens_resolve() {
        let identity = MemoryIdentity::new(TEST_JWT_SECRET);
        let id = identity.register("admin@example.com", "secret1");

        assert!(matches!(
            identity.sign_in_with_password("admin@example.com", "wrong").await,
            Err(IdentityError::InvalidCredentials)
        ));

        let auth = identity.sign_in_with_password("admin@example.com", "secret1").await.unwrap();
        let session = SessionResolver::new(TEST_JWT_SECRET, "sb").validate(&auth.access_token).unwrap();
        assert_eq!(session.user_id, id);
    }

    #[tokio::test]
    async fn test_refresh_tokens_rotate() {
        let identity = MemoryIdentity::new(TEST_JWT_SECRET);
        let id = identity.register("paul@example.com", "secret1");
        let refresh = identity.issue_refresh_token(id, "paul@example.com");

        let renewed = identity.refresh_session(&refresh).await.unwrap();
        assert_eq!(renewed.user.id, id);
        assert_ne!(renewed.refresh_token.as_deref(), Some(refresh.as_str()));
        assert!(matches!(
            identity.refresh_session(&refresh).await,
            Err(IdentityError::InvalidCredentials)
        ));

        let resolver = SessionResolver::new(TEST_JWT_SECRET, "sb");
        assert!(resolver.validate(&identity.expired_token_for(id, "paul@example.com")).is_err());
        assert!(resolver.validate(&renewed.access_token).is_ok());
    }

    #[tokio::test]
    async fn test_signup_provisions_profile() {
        let store = Arc::new(MemoryStore::new());
        let identity = MemoryIdentity::new(TEST_JWT_SECRET).provisioning(store.clone(), Role::Client);
        let metadata = SignUpMetadata { nom: "Martin".into(), prenom: "Léa".into() };

        let user = identity.sign_up("lea@example.com", "secret1", &metadata).await.unwrap();
        let profiles = store.rows(Table::Profiles);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["id"], json!(user.id));
        assert_eq!(profiles[0]["role"], "client");

        assert!(identity.sign_up("lea@example.com", "secret1", &metadata).await.is_err());
    }
}
