// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer.
//!
//! The `Storage` trait is injected into handlers through `AppState` as
//! `Arc<dyn Storage>`; there are no module-level singletons. `PgStorage` is
//! the production implementation, `MemoryStorage` backs the test suite.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{AuthToken, NewUser, OauthProfile, Session, TokenKind, User};

/// Persistent store for users, issued tokens and OAuth sessions.
///
/// Credit updates are plain field assignments, not compare-and-swap:
/// concurrent writers race and the last one wins.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─── User operations ─────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create a password account with default starting balances.
    /// Fails with `AppError::DuplicateEmail` if the email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Create or refresh an OAuth account, keyed by email.
    ///
    /// On first login the user is created with default balances and no
    /// password hash. Returns the user and whether it was newly created.
    async fn upsert_oauth_user(&self, profile: OauthProfile) -> Result<(User, bool), AppError>;

    /// Assign new balances and/or bump the cumulative used counter.
    /// `None` leaves the corresponding balance untouched.
    async fn update_user_credits(
        &self,
        id: &str,
        penora_credits: Option<i64>,
        imagegene_credits: Option<i64>,
        used_delta: i64,
    ) -> Result<User, AppError>;

    async fn touch_last_login(&self, id: &str) -> Result<(), AppError>;

    async fn set_welcome_email_sent(&self, id: &str) -> Result<(), AppError>;

    // ─── Token operations ────────────────────────────────────────

    async fn insert_token(&self, token: &AuthToken) -> Result<(), AppError>;

    async fn get_token(&self, token: &str) -> Result<Option<AuthToken>, AppError>;

    async fn delete_token(&self, token: &str) -> Result<(), AppError>;

    /// Delete all of a user's tokens, optionally limited to one kind.
    async fn delete_user_tokens(
        &self,
        user_id: &str,
        kind: Option<TokenKind>,
    ) -> Result<(), AppError>;

    /// Remove expired tokens; returns how many were deleted.
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    // ─── Session operations ──────────────────────────────────────

    async fn create_session(&self, session: &Session) -> Result<(), AppError>;

    async fn get_session(&self, sid: &str) -> Result<Option<Session>, AppError>;

    async fn delete_session(&self, sid: &str) -> Result<(), AppError>;

    // ─── Admin ───────────────────────────────────────────────────

    async fn admin_stats(&self, now: DateTime<Utc>) -> Result<AdminStats, AppError>;
}

/// Aggregate statistics for the admin panel.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    /// Accounts created in the last 24 hours
    pub new_users_24h: u64,
    /// Accounts with a login in the last 10 minutes
    pub active_users: u64,
    pub total_credits_used: i64,
    pub avg_penora_credits: i64,
    pub avg_imagegene_credits: i64,
    /// Ten most recent signups
    pub recent_users: Vec<RecentUser>,
}

/// Condensed user row for the admin recent-signups list.
#[derive(Debug, Clone, Serialize)]
pub struct RecentUser {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub total_credits_used: i64,
}
