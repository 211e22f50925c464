use std::sync::Arc;

use crate::auth::{IdentityProvider, SessionResolver};
use crate::config::AppConfig;
use crate::database::DataStore;

/// Process-scoped collaborators, built once at startup and shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DataStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: SessionResolver,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DataStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let sessions = SessionResolver::from_config(&config);
        Self {
            config: Arc::new(config),
            store,
            identity,
            sessions,
        }
    }
}
