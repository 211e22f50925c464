#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{header, redirect, RequestBuilder, Response, StatusCode};
use uuid::Uuid;

use taskmanager_plv::policy::Role;
use taskmanager_plv::testing::{test_config, MemoryIdentity, MemoryStore, TEST_JWT_SECRET};
use taskmanager_plv::{app, AppState};

pub const PASSWORD: &str = "motdepasse";

/// In-process server on a free port, backed by in-memory collaborators
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentity>,
    pub cookie_name: String,
    pub refresh_cookie_name: String,
    client: reqwest::Client,
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(MemoryIdentity::new(TEST_JWT_SECRET).provisioning(store.clone(), Role::Client));
        Self::spawn_with(store, identity).await
    }

    pub async fn spawn_with(store: Arc<MemoryStore>, identity: Arc<MemoryIdentity>) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = test_config();
        let cookie_name = config.security.session_cookie.clone();
        let refresh_cookie_name = config.security.refresh_cookie.clone();
        let state = AppState::new(config, store.clone(), identity.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        // Redirects are part of what is under test, never follow them
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;

        let server = Self { base_url, store, identity, cookie_name, refresh_cookie_name, client };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.client.get(self.url("/health")).send().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Attach a session cookie the way a browser would
    pub fn with_session(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header(header::COOKIE, format!("{}={}", self.cookie_name, token))
    }

    /// Attach an access cookie together with a refresh cookie
    pub fn with_refresh(&self, request: RequestBuilder, token: &str, refresh_token: &str) -> RequestBuilder {
        request.header(
            header::COOKIE,
            format!("{}={}; {}={}", self.cookie_name, token, self.refresh_cookie_name, refresh_token),
        )
    }

    /// Account with a valid token but no profile row yet
    pub fn user_without_profile(&self, email: &str) -> TestUser {
        let id = self.identity.register(email, PASSWORD);
        let token = self.identity.token_for(id, email);
        TestUser { id, email: email.to_string(), token }
    }

    /// Account with a provisioned profile holding `role`
    pub fn user_with_role(&self, role: Role, email: &str) -> TestUser {
        let user = self.user_without_profile(email);
        self.store.seed_profile(user.id, role, email);
        user
    }
}

/// Location header of a redirect response
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Value of the cookie `name` set by a response, if any
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next()?.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

pub fn assert_redirect(response: &Response, to: &str) {
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "expected redirect to {}", to);
    assert_eq!(location(response).as_deref(), Some(to));
}
