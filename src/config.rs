// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded once from environment variables.
//!
//! Everything is read at process start; there is no hot-reload. The JWT and
//! session secrets are required with no development fallback: a process
//! that cannot sign tokens must not start.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// Public base URL of this server (OAuth callback construction)
    pub server_url: String,
    /// Postgres connection string
    pub database_url: Option<String>,

    /// JWT signing key for session and embed tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// HMAC key for signing the OAuth state parameter
    pub session_secret: Vec<u8>,

    /// Google OAuth client credentials. Google login is disabled when absent.
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,

    /// Base URL of the Penora writing tool
    pub penora_base_url: Option<String>,
    /// Shared API key sent to Penora as X-API-Key
    pub penora_api_key: Option<String>,
    /// Base URL of the ImageGene image tool
    pub imagegene_base_url: Option<String>,
    /// Per-call timeout for remote credit fetches, in seconds
    pub remote_timeout_secs: u64,

    /// HTTP email provider endpoint. Email delivery is disabled when absent.
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    /// From address for outgoing mail
    pub email_from: String,
    /// Inbox that receives contact-form notifications
    pub contact_inbox: String,

    /// Shared admin password for the stats panel
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            server_url: env::var("SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            database_url: env::var("DATABASE_URL").ok(),

            // Required secrets. No hardcoded development fallback.
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
            session_secret: env::var("SESSION_SECRET")
                .map_err(|_| ConfigError::Missing("SESSION_SECRET"))?
                .into_bytes(),

            google_client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),

            penora_base_url: env::var("PENORA_APP_URL").ok().map(|v| v.trim().to_string()),
            penora_api_key: env::var("PENORA_API_KEY").ok(),
            imagegene_base_url: env::var("IMAGEGENE_BASE_URL")
                .ok()
                .map(|v| v.trim().to_string()),
            remote_timeout_secs: env::var("REMOTE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            email_api_url: env::var("EMAIL_API_URL").ok(),
            email_api_key: env::var("EMAIL_API_KEY").ok(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "hello@sukusuku.ai".to_string()),
            contact_inbox: env::var("CONTACT_INBOX")
                .unwrap_or_else(|_| "developers@sukusuku.ai".to_string()),

            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }

    /// Whether auth cookies should carry the Secure attribute.
    pub fn cookies_secure(&self) -> bool {
        self.server_url.starts_with("https://")
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            server_url: "http://localhost:8080".to_string(),
            database_url: None,
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            session_secret: b"test_session_key_32_bytes_min!!!".to_vec(),
            google_client_id: Some("test_google_client".to_string()),
            google_client_secret: Some("test_google_secret".to_string()),
            // Nothing listens here; remote fetches fail fast in tests.
            penora_base_url: Some("http://127.0.0.1:1".to_string()),
            penora_api_key: Some("test_penora_key".to_string()),
            imagegene_base_url: Some("http://127.0.0.1:1".to_string()),
            remote_timeout_secs: 1,
            email_api_url: None,
            email_api_key: None,
            email_from: "hello@sukusuku.ai".to_string(),
            contact_inbox: "developers@sukusuku.ai".to_string(),
            admin_password: Some("test_admin_password".to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookies_secure_follows_server_url_scheme() {
        let mut config = Config::test_default();
        assert!(!config.cookies_secure());

        config.server_url = "https://sukusuku.ai".to_string();
        assert!(config.cookies_secure());
    }

    #[test]
    fn test_config_missing_secret_is_fatal() {
        // from_env must refuse to fall back to a baked-in signing secret.
        env::remove_var("JWT_SECRET");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }
}
