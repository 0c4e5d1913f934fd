// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token issuance and verification.
//!
//! Two token shapes, both HS256-signed with the configured secret and both
//! recorded in the auth-token store at mint time so logout can revoke them.
//! The embed token additionally freezes the user's profile and balances as
//! of mint time: it is handed to an externally hosted iframe via URL so the
//! external app can identify the user without a shared session.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::Storage;
use crate::error::{AppError, Result};
use crate::models::{AuthToken, TokenKind, User};

/// Session token lifetime, in days.
pub const SESSION_TOKEN_TTL_DAYS: i64 = 7;
/// Embed token lifetime, in hours.
pub const EMBED_TOKEN_TTL_HOURS: i64 = 1;

/// Claims carried by a session token.
///
/// `jti` makes every minted token unique. Without it, two tokens for one
/// user within the same second would be byte-identical and collide in the
/// token store, so revoking one would revoke "both".
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Unique token id
    pub jti: String,
}

/// Claims carried by an embed token: identity plus a mint-time snapshot of
/// the credit balances. Balances mutated after minting are not reflected.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EmbedClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    /// Unique token id
    pub jti: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub penora_credits: i64,
    pub imagegene_credits: i64,
    /// Target application ("penora", "imagegene", or "general")
    pub app_name: String,
}

/// Signs, records and verifies tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    storage: Arc<dyn Storage>,
}

impl TokenService {
    pub fn new(secret: Vec<u8>, storage: Arc<dyn Storage>) -> Self {
        Self { secret, storage }
    }

    /// Mint a session token for general API access and record it for
    /// revocation.
    pub async fn issue_session_token(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let expires_at = now + Duration::days(SESSION_TOKEN_TTL_DAYS);

        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.sign(&claims)?;

        self.record(&token, user_id, TokenKind::Session, expires_at, now)
            .await?;
        Ok(token)
    }

    /// Mint an embed token carrying a snapshot of the user's profile and
    /// balances as of now.
    pub async fn issue_embed_token(&self, user: &User, app_name: &str) -> Result<String> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(EMBED_TOKEN_TTL_HOURS);

        let claims = EmbedClaims {
            sub: user.id.clone(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_image_url: user.profile_image_url.clone(),
            penora_credits: user.penora_or_default(),
            imagegene_credits: user.imagegene_or_default(),
            app_name: app_name.to_string(),
        };
        let token = self.sign(&claims)?;

        self.record(&token, &user.id, TokenKind::Embed, expires_at, now)
            .await?;
        Ok(token)
    }

    /// Verify a session token's signature and expiry, then cross-check the
    /// store: a revoked token fails here even with a valid signature.
    pub async fn verify_session_token(&self, token: &str) -> Result<String> {
        let key = DecodingKey::from_secret(&self.secret);
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|_| AppError::InvalidToken)?;

        let record = self
            .storage
            .get_token(token)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if record.kind != TokenKind::Session || record.is_expired(Utc::now()) {
            return Err(AppError::InvalidToken);
        }

        Ok(data.claims.sub)
    }

    /// Revoke a single token.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.storage.delete_token(token).await
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT signing failed: {}", e)))
    }

    async fn record(
        &self,
        token: &str,
        user_id: &str,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.storage
            .insert_token(&AuthToken {
                token: token.to_string(),
                user_id: user_id.to_string(),
                kind,
                expires_at,
                created_at: now,
            })
            .await
    }
}

/// Decode an embed token without a store lookup. The external apps only
/// check the signature; this mirrors their view of the token.
pub fn decode_embed_token(token: &str, secret: &[u8]) -> Result<EmbedClaims> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<EmbedClaims>(token, &key, &validation).map_err(|_| AppError::InvalidToken)?;
    Ok(data.claims)
}
