// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory storage used by the test suite.
//!
//! Mirrors `PgStorage` semantics, including duplicate-email rejection and
//! last-writer-wins credit assignment.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::{AdminStats, RecentUser, Storage};
use crate::error::AppError;
use crate::models::credits::{DEFAULT_IMAGEGENE_CREDITS, DEFAULT_PENORA_CREDITS};
use crate::models::{AuthProvider, AuthToken, NewUser, OauthProfile, Session, TokenKind, User};

/// Concurrent-map storage with no persistence.
#[derive(Default)]
pub struct MemoryStorage {
    users: DashMap<String, User>,
    tokens: DashMap<String, AuthToken>,
    sessions: DashMap<String, Session>,
    // Serializes the email check-then-insert; Postgres gets the same
    // guarantee from the unique constraint on users.email.
    email_guard: std::sync::Mutex<()>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.find_by_email(email))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let _guard = self.email_guard.lock().unwrap_or_else(|e| e.into_inner());
        if self.find_by_email(&new_user.email).is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            password_hash: Some(new_user.password_hash),
            auth_provider: AuthProvider::Password,
            first_name: Some(new_user.first_name),
            last_name: Some(new_user.last_name),
            profile_image_url: None,
            email_verified: false,
            welcome_email_sent: false,
            penora_credits: Some(DEFAULT_PENORA_CREDITS),
            imagegene_credits: Some(DEFAULT_IMAGEGENE_CREDITS),
            total_credits_used: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn upsert_oauth_user(&self, profile: OauthProfile) -> Result<(User, bool), AppError> {
        let now = Utc::now();

        let _guard = self.email_guard.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = self.find_by_email(&profile.email) {
            let mut entry = self
                .users
                .get_mut(&existing.id)
                .ok_or_else(|| AppError::Database("User vanished during upsert".to_string()))?;
            let user = entry.value_mut();
            if profile.first_name.is_some() {
                user.first_name = profile.first_name;
            }
            if profile.last_name.is_some() {
                user.last_name = profile.last_name;
            }
            if profile.profile_image_url.is_some() {
                user.profile_image_url = profile.profile_image_url;
            }
            user.last_login_at = Some(now);
            user.updated_at = now;
            return Ok((user.clone(), false));
        }

        let user = User {
            id: profile.provider_id,
            email: profile.email,
            password_hash: None,
            auth_provider: AuthProvider::Google,
            first_name: profile.first_name,
            last_name: profile.last_name,
            profile_image_url: profile.profile_image_url,
            email_verified: true,
            welcome_email_sent: false,
            penora_credits: Some(DEFAULT_PENORA_CREDITS),
            imagegene_credits: Some(DEFAULT_IMAGEGENE_CREDITS),
            total_credits_used: 0,
            last_login_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok((user, true))
    }

    async fn update_user_credits(
        &self,
        id: &str,
        penora_credits: Option<i64>,
        imagegene_credits: Option<i64>,
        used_delta: i64,
    ) -> Result<User, AppError> {
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        let user = entry.value_mut();
        if penora_credits.is_some() {
            user.penora_credits = penora_credits;
        }
        if imagegene_credits.is_some() {
            user.imagegene_credits = imagegene_credits;
        }
        user.total_credits_used = user.total_credits_used.saturating_add(used_delta);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn touch_last_login(&self, id: &str) -> Result<(), AppError> {
        if let Some(mut entry) = self.users.get_mut(id) {
            let now = Utc::now();
            entry.value_mut().last_login_at = Some(now);
            entry.value_mut().updated_at = now;
        }
        Ok(())
    }

    async fn set_welcome_email_sent(&self, id: &str) -> Result<(), AppError> {
        if let Some(mut entry) = self.users.get_mut(id) {
            entry.value_mut().welcome_email_sent = true;
            entry.value_mut().updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_token(&self, token: &AuthToken) -> Result<(), AppError> {
        self.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<AuthToken>, AppError> {
        Ok(self.tokens.get(token).map(|t| t.clone()))
    }

    async fn delete_token(&self, token: &str) -> Result<(), AppError> {
        self.tokens.remove(token);
        Ok(())
    }

    async fn delete_user_tokens(
        &self,
        user_id: &str,
        kind: Option<TokenKind>,
    ) -> Result<(), AppError> {
        self.tokens
            .retain(|_, t| t.user_id != user_id || kind.is_some_and(|k| t.kind != k));
        Ok(())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| !t.is_expired(now));
        Ok((before - self.tokens.len()) as u64)
    }

    async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        self.sessions.insert(session.sid.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, sid: &str) -> Result<Option<Session>, AppError> {
        Ok(self.sessions.get(sid).map(|s| s.clone()))
    }

    async fn delete_session(&self, sid: &str) -> Result<(), AppError> {
        self.sessions.remove(sid);
        Ok(())
    }

    async fn admin_stats(&self, now: DateTime<Utc>) -> Result<AdminStats, AppError> {
        let day_ago = now - Duration::hours(24);
        let ten_minutes_ago = now - Duration::minutes(10);

        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_users = users.len() as u64;
        let new_users_24h = users.iter().filter(|u| u.created_at > day_ago).count() as u64;
        let active_users = users
            .iter()
            .filter(|u| u.last_login_at.is_some_and(|t| t > ten_minutes_ago))
            .count() as u64;
        let total_credits_used: i64 = users.iter().map(|u| u.total_credits_used).sum();

        let avg = |values: Vec<i64>| -> i64 {
            if values.is_empty() {
                0
            } else {
                let sum: i64 = values.iter().sum();
                (sum as f64 / values.len() as f64).round() as i64
            }
        };
        let avg_penora_credits = avg(users.iter().filter_map(|u| u.penora_credits).collect());
        let avg_imagegene_credits = avg(users.iter().filter_map(|u| u.imagegene_credits).collect());

        let recent_users = users
            .iter()
            .take(10)
            .map(|u| RecentUser {
                id: u.id.clone(),
                email: u.email.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                created_at: u.created_at,
                last_login_at: u.last_login_at,
                total_credits_used: u.total_credits_used,
            })
            .collect();

        Ok(AdminStats {
            total_users,
            new_users_24h,
            active_users,
            total_credits_used,
            avg_penora_credits,
            avg_imagegene_credits,
            recent_users,
        })
    }
}
