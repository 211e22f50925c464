use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

/// Hosted backend: auth REST API and PostgREST data API share one project URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub session_cookie: String,
    /// Holds the refresh token that renews an expired access token
    pub refresh_cookie: String,
    pub cookie_secure: bool,
    pub session_max_age_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("SERVER_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SERVER_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }

        // Backend overrides
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.backend.url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("SUPABASE_ANON_KEY") {
            self.backend.anon_key = v;
        }
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.backend.jwt_secret = v;
        }
        if let Ok(v) = env::var("BACKEND_REQUEST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = v.parse().unwrap_or(self.backend.request_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_SESSION_COOKIE") {
            if !v.trim().is_empty() {
                self.security.session_cookie = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_COOKIE") {
            if !v.trim().is_empty() {
                self.security.refresh_cookie = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }
        if let Ok(v) = env::var("SECURITY_SESSION_MAX_AGE_SECS") {
            self.security.session_max_age_secs = v.parse().unwrap_or(self.security.session_max_age_secs);
        }

        self
    }

    /// Whether the hosted backend settings are complete enough to start
    pub fn validate(&self) -> Result<(), String> {
        if url::Url::parse(&self.backend.url).is_err() {
            return Err(format!("SUPABASE_URL is not a valid URL: '{}'", self.backend.url));
        }
        if self.backend.anon_key.len() <= 10 {
            return Err("SUPABASE_ANON_KEY is missing or too short".to_string());
        }
        if self.backend.jwt_secret.is_empty() {
            return Err("SUPABASE_JWT_SECRET is not configured".to_string());
        }
        if self.security.refresh_cookie == self.security.session_cookie {
            return Err("SECURITY_REFRESH_COOKIE must differ from SECURITY_SESSION_COOKIE".to_string());
        }
        Ok(())
    }

    pub fn server_request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                request_timeout_secs: 30,
            },
            backend: BackendConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: String::new(),
                jwt_secret: String::new(),
                request_timeout_secs: 10,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                session_cookie: "sb-access-token".to_string(),
                refresh_cookie: "sb-refresh-token".to_string(),
                cookie_secure: false,
                session_max_age_secs: 60 * 60 * 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                request_timeout_secs: 15,
            },
            backend: BackendConfig {
                url: String::new(),
                anon_key: String::new(),
                jwt_secret: String::new(),
                request_timeout_secs: 5,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                session_cookie: "sb-access-token".to_string(),
                refresh_cookie: "sb-refresh-token".to_string(),
                cookie_secure: true,
                session_max_age_secs: 60 * 60 * 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                request_timeout_secs: 10,
            },
            backend: BackendConfig {
                url: String::new(),
                anon_key: String::new(),
                jwt_secret: String::new(),
                request_timeout_secs: 5,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                session_cookie: "sb-access-token".to_string(),
                refresh_cookie: "sb-refresh-token".to_string(),
                cookie_secure: true,
                session_max_age_secs: 60 * 60 * 8,
            },
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment, Environment::Development)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 3000);
        assert!(!config.security.cookie_secure);
        assert_eq!(config.security.session_cookie, "sb-access-token");
        assert!(config.is_development());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.cookie_secure);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.is_development());
    }

    #[test]
    fn test_validate_rejects_incomplete_backend() {
        let mut config = AppConfig::development();
        assert!(config.validate().is_err());

        config.backend.anon_key = "anon-key-0123456789".to_string();
        assert!(config.validate().unwrap_err().contains("JWT"));

        config.backend.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());

        config.backend.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refresh_cookie_must_be_distinct() {
        let mut config = AppConfig::development();
        config.backend.anon_key = "anon-key-0123456789".to_string();
        config.backend.jwt_secret = "secret".to_string();
        assert_eq!(config.security.refresh_cookie, "sb-refresh-token");
        assert!(config.validate().is_ok());

        config.security.refresh_cookie = config.security.session_cookie.clone();
        assert!(config.validate().unwrap_err().contains("SECURITY_REFRESH_COOKIE"));
    }
}
