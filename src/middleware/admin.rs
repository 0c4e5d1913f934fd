// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin authentication middleware.
//!
//! Admin access is a single shared password exchanged for a short-lived
//! signed credential. No admin user record exists in storage.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::AppState;

/// Admin credential lifetime.
pub const ADMIN_TOKEN_TTL_HOURS: i64 = 12;

const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
struct AdminClaims {
    sub: String,
    role: String,
    exp: usize,
    iat: usize,
}

/// Mint a signed admin credential.
pub fn issue_admin_token(secret: &[u8]) -> Result<String> {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: ADMIN_ROLE.to_string(),
        role: ADMIN_ROLE.to_string(),
        exp: (now + Duration::hours(ADMIN_TOKEN_TTL_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Admin token signing failed: {}", e)))
}

fn verify_admin_token(token: &str, secret: &[u8]) -> Result<()> {
    let data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    if data.claims.role != ADMIN_ROLE {
        return Err(AppError::InvalidToken);
    }
    Ok(())
}

/// Middleware guarding admin routes: requires a valid admin bearer token.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    verify_admin_token(token, &state.config.jwt_secret)?;

    Ok(next.run(request).await)
}
