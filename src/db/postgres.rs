// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postgres implementation of the storage trait (sqlx).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{AdminStats, RecentUser, Storage};
use crate::error::AppError;
use crate::models::credits::{DEFAULT_IMAGEGENE_CREDITS, DEFAULT_PENORA_CREDITS};
use crate::models::{AuthProvider, AuthToken, NewUser, OauthProfile, Session, TokenKind, User};

const USER_COLUMNS: &str = "id, email, password_hash, auth_provider, first_name, last_name, \
     profile_image_url, email_verified, welcome_email_sent, penora_credits, imagegene_credits, \
     total_credits_used, last_login_at, created_at, updated_at";

/// Postgres-backed storage.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connect to Postgres and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Postgres: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))?;

        tracing::info!("Connected to Postgres");
        Ok(Self { pool })
    }

    fn map_err(e: sqlx::Error) -> AppError {
        if let Some(db_err) = e.as_database_error() {
            // 23505 = unique_violation; the only unique constraints are on
            // users.email and tokens.token
            if db_err.code().as_deref() == Some("23505") {
                return AppError::DuplicateEmail;
            }
        }
        AppError::Database(e.to_string())
    }
}

/// Raw user row; `auth_provider` is decoded separately.
#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: Option<String>,
    auth_provider: String,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image_url: Option<String>,
    email_verified: bool,
    welcome_email_sent: bool,
    penora_credits: Option<i64>,
    imagegene_credits: Option<i64>,
    total_credits_used: i64,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, AppError> {
        let auth_provider = AuthProvider::parse(&row.auth_provider).ok_or_else(|| {
            AppError::Database(format!("Unknown auth provider: {}", row.auth_provider))
        })?;

        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            auth_provider,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_image_url: row.profile_image_url,
            email_verified: row.email_verified,
            welcome_email_sent: row.welcome_email_sent,
            penora_credits: row.penora_credits,
            imagegene_credits: row.imagegene_credits,
            total_credits_used: row.total_credits_used,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TokenRow {
    token: String,
    user_id: String,
    kind: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for AuthToken {
    type Error = AppError;

    fn try_from(row: TokenRow) -> Result<Self, AppError> {
        let kind = TokenKind::parse(&row.kind)
            .ok_or_else(|| AppError::Database(format!("Unknown token kind: {}", row.kind)))?;
        Ok(AuthToken {
            token: row.token,
            user_id: row.user_id,
            kind,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    sid: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            sid: row.sid,
            user_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Self::map_err)?;
        row.map(User::try_from).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?;
        row.map(User::try_from).transpose()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users \
                 (id, email, password_hash, auth_provider, first_name, last_name, \
                  penora_credits, imagegene_credits, total_credits_used) \
             VALUES ($1, $2, $3, 'password', $4, $5, $6, $7, 0) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(DEFAULT_PENORA_CREDITS)
        .bind(DEFAULT_IMAGEGENE_CREDITS)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_err)?;
        row.try_into()
    }

    async fn upsert_oauth_user(&self, profile: OauthProfile) -> Result<(User, bool), AppError> {
        // Keyed by email so a returning Google user keeps their row even if
        // the provider id was never stored.
        if let Some(existing) = self.get_user_by_email(&profile.email).await? {
            let row: UserRow = sqlx::query_as(&format!(
                "UPDATE users SET first_name = COALESCE($2, first_name), \
                     last_name = COALESCE($3, last_name), \
                     profile_image_url = COALESCE($4, profile_image_url), \
                     last_login_at = NOW(), updated_at = NOW() \
                 WHERE id = $1 RETURNING {}",
                USER_COLUMNS
            ))
            .bind(&existing.id)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.profile_image_url)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_err)?;
            return Ok((row.try_into()?, false));
        }

        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users \
                 (id, email, auth_provider, first_name, last_name, profile_image_url, \
                  email_verified, penora_credits, imagegene_credits, total_credits_used, \
                  last_login_at) \
             VALUES ($1, $2, 'google', $3, $4, $5, TRUE, $6, $7, 0, NOW()) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&profile.provider_id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.profile_image_url)
        .bind(DEFAULT_PENORA_CREDITS)
        .bind(DEFAULT_IMAGEGENE_CREDITS)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok((row.try_into()?, true))
    }

    async fn update_user_credits(
        &self,
        id: &str,
        penora_credits: Option<i64>,
        imagegene_credits: Option<i64>,
        used_delta: i64,
    ) -> Result<User, AppError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET \
                 penora_credits = COALESCE($2, penora_credits), \
                 imagegene_credits = COALESCE($3, imagegene_credits), \
                 total_credits_used = total_credits_used + $4, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(penora_credits)
        .bind(imagegene_credits)
        .bind(used_delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?;

        row.ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?
            .try_into()
    }

    async fn touch_last_login(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_welcome_email_sent(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET welcome_email_sent = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn insert_token(&self, token: &AuthToken) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO auth_tokens (token, user_id, kind, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.token)
        .bind(&token.user_id)
        .bind(token.kind.as_str())
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<AuthToken>, AppError> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT token, user_id, kind, expires_at, created_at \
             FROM auth_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?;
        row.map(AuthToken::try_from).transpose()
    }

    async fn delete_token(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM auth_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete_user_tokens(
        &self,
        user_id: &str,
        kind: Option<TokenKind>,
    ) -> Result<(), AppError> {
        match kind {
            Some(kind) => {
                sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND kind = $2")
                    .bind(user_id)
                    .bind(kind.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(Self::map_err)?;
            }
            None => {
                sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await
                    .map_err(Self::map_err)?;
            }
        }
        Ok(())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(result.rows_affected())
    }

    async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (sid, user_id, expires_at, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.sid)
        .bind(&session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }

    async fn get_session(&self, sid: &str) -> Result<Option<Session>, AppError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT sid, user_id, expires_at, created_at FROM sessions WHERE sid = $1",
        )
        .bind(sid)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(row.map(Session::from))
    }

    async fn delete_session(&self, sid: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE sid = $1")
            .bind(sid)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn admin_stats(&self, now: DateTime<Utc>) -> Result<AdminStats, AppError> {
        let day_ago = now - Duration::hours(24);
        let ten_minutes_ago = now - Duration::minutes(10);

        #[derive(FromRow)]
        struct Overview {
            total_users: i64,
            new_users_24h: i64,
            active_users: i64,
            total_credits_used: Option<i64>,
            avg_penora: Option<f64>,
            avg_imagegene: Option<f64>,
        }

        let overview: Overview = sqlx::query_as(
            "SELECT COUNT(*) AS total_users, \
                 COUNT(*) FILTER (WHERE created_at > $1) AS new_users_24h, \
                 COUNT(*) FILTER (WHERE last_login_at > $2) AS active_users, \
                 SUM(total_credits_used) AS total_credits_used, \
                 AVG(penora_credits)::double precision AS avg_penora, \
                 AVG(imagegene_credits)::double precision AS avg_imagegene \
             FROM users",
        )
        .bind(day_ago)
        .bind(ten_minutes_ago)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_err)?;

        #[derive(FromRow)]
        struct Recent {
            id: String,
            email: String,
            first_name: Option<String>,
            last_name: Option<String>,
            created_at: DateTime<Utc>,
            last_login_at: Option<DateTime<Utc>>,
            total_credits_used: i64,
        }

        let recent: Vec<Recent> = sqlx::query_as(
            "SELECT id, email, first_name, last_name, created_at, last_login_at, \
                 total_credits_used \
             FROM users ORDER BY created_at DESC LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_err)?;

        Ok(AdminStats {
            total_users: overview.total_users as u64,
            new_users_24h: overview.new_users_24h as u64,
            active_users: overview.active_users as u64,
            total_credits_used: overview.total_credits_used.unwrap_or(0),
            avg_penora_credits: overview.avg_penora.unwrap_or(0.0).round() as i64,
            avg_imagegene_credits: overview.avg_imagegene.unwrap_or(0.0).round() as i64,
            recent_users: recent
                .into_iter()
                .map(|r| RecentUser {
                    id: r.id,
                    email: r.email,
                    first_name: r.first_name,
                    last_name: r.last_name,
                    created_at: r.created_at,
                    last_login_at: r.last_login_at,
                    total_credits_used: r.total_credits_used,
                })
                .collect(),
        })
    }
}
