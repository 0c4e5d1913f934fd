// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User, auth token and session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::credits::{DEFAULT_IMAGEGENE_CREDITS, DEFAULT_PENORA_CREDITS};

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email/password signup
    Password,
    /// Google OAuth
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Password => "password",
            AuthProvider::Google => "google",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "password" => Some(AuthProvider::Password),
            "google" => Some(AuthProvider::Google),
            _ => None,
        }
    }
}

/// A user account.
///
/// Balances are optional: a NULL balance means "never set" and is rendered
/// with the hardcoded defaults (100 Penora / 50 ImageGene) by the credit
/// reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique id (UUIDv4 for password signups, provider id for OAuth)
    pub id: String,
    /// Unique across all users regardless of provider
    pub email: String,
    /// Present only for password accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub auth_provider: AuthProvider,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub email_verified: bool,
    pub welcome_email_sent: bool,
    pub penora_credits: Option<i64>,
    pub imagegene_credits: Option<i64>,
    pub total_credits_used: i64,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Stored Penora balance, or the new-user default when never set.
    pub fn penora_or_default(&self) -> i64 {
        self.penora_credits.unwrap_or(DEFAULT_PENORA_CREDITS)
    }

    /// Stored ImageGene balance, or the new-user default when never set.
    pub fn imagegene_or_default(&self) -> i64 {
        self.imagegene_credits.unwrap_or(DEFAULT_IMAGEGENE_CREDITS)
    }
}

/// Fields for creating a password account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Profile fields received from the OAuth provider.
#[derive(Debug, Clone)]
pub struct OauthProfile {
    /// Provider-assigned subject id, used as the user id on first login
    pub provider_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Kind of issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Long-lived token identifying a user for general API access (~7 days)
    Session,
    /// Short-lived token passed via URL to an external iframe (~1 hour)
    Embed,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Session => "session",
            TokenKind::Embed => "embed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "session" => Some(TokenKind::Session),
            "embed" => Some(TokenKind::Embed),
            _ => None,
        }
    }
}

/// An issued token, recorded so it can be explicitly revoked.
///
/// A token authorizes a request only while it is unexpired AND still present
/// in the store; the JWT signature alone is not sufficient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    pub user_id: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Server-side session for OAuth logins, referenced by the `sid` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub sid: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_defaults_apply_only_when_unset() {
        let user = test_user(None, Some(7));
        assert_eq!(user.penora_or_default(), DEFAULT_PENORA_CREDITS);
        assert_eq!(user.imagegene_or_default(), 7);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = test_user(Some(3), Some(4));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@b.c");
    }

    fn test_user(penora: Option<i64>, imagegene: Option<i64>) -> User {
        User {
            id: "u1".to_string(),
            email: "a@b.c".to_string(),
            password_hash: Some("secret-hash".to_string()),
            auth_provider: AuthProvider::Password,
            first_name: Some("A".to_string()),
            last_name: Some("B".to_string()),
            profile_image_url: None,
            email_verified: false,
            welcome_email_sent: false,
            penora_credits: penora,
            imagegene_credits: imagegene,
            total_credits_used: 0,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
