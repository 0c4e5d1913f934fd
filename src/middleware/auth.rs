// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication gateway middleware.
//!
//! Two auth mechanisms coexist: server-side OAuth sessions (`sid` cookie)
//! and signed session tokens (`auth_token` cookie or bearer header). They
//! are resolved once here, in that order, into a single normalized
//! `AuthUser` so downstream handlers never care which mechanism won.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::User;
use crate::AppState;

/// Cookie holding the OAuth session id.
pub const SESSION_COOKIE: &str = "sid";
/// Cookie holding the signed session token.
pub const TOKEN_COOKIE: &str = "auth_token";

/// Which mechanism authenticated the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOrigin {
    /// OAuth session cookie
    Session,
    /// Signed session token (cookie or bearer)
    Token,
}

/// Authenticated user context attached to the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub origin: AuthOrigin,
}

/// Middleware that requires a valid session or session token.
///
/// Credentials are copied out of the request up front so nothing borrowed
/// from it is held across the storage awaits (the request body is not
/// `Sync`, which would otherwise make this future non-`Send`).
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let sid = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let token = jar
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|t| t.to_string())
        });

    let auth_user = resolve(&state, sid.as_deref(), token.as_deref())
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Resolve the auth context, trying the OAuth session first and the signed
/// token second. `Ok(None)` means neither credential matched.
async fn resolve(
    state: &AppState,
    sid: Option<&str>,
    token: Option<&str>,
) -> Result<Option<AuthUser>, AppError> {
    // (a) OAuth session cookie
    if let Some(sid) = sid {
        if let Some(session) = state.storage.get_session(sid).await? {
            if !session.is_expired(Utc::now()) {
                if let Some(user) = state.storage.get_user(&session.user_id).await? {
                    return Ok(Some(AuthUser {
                        user,
                        origin: AuthOrigin::Session,
                    }));
                }
            }
        }
    }

    // (b) Signed session token (cookie or bearer)
    if let Some(token) = token {
        match state.tokens.verify_session_token(token).await {
            Ok(user_id) => {
                if let Some(user) = state.storage.get_user(&user_id).await? {
                    return Ok(Some(AuthUser {
                        user,
                        origin: AuthOrigin::Token,
                    }));
                }
            }
            Err(AppError::InvalidToken) => {
                tracing::debug!("Session token rejected");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(None)
}
