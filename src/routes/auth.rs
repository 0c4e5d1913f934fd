// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: email/password accounts, Google OAuth, and
//! embed-token minting for the externally hosted tools.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, SESSION_COOKIE, TOKEN_COOKIE};
use crate::models::{Session, User};
use crate::services::google::verify_and_decode_state;
use crate::services::tokens::{EMBED_TOKEN_TTL_HOURS, SESSION_TOKEN_TTL_DAYS};
use crate::AppState;

/// OAuth session lifetime, in hours.
pub const OAUTH_SESSION_TTL_HOURS: i64 = 24;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/google", get(google_start))
        .route("/api/auth/google/callback", get(google_callback))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/user", get(current_user))
        .route("/api/auth/token", get(issue_embed_token))
        .route("/api/auth/app-token/{app}", get(issue_app_token))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
}

/// Session-token cookie, HttpOnly with the session token's own lifetime.
fn auth_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.cookies_secure())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_TOKEN_TTL_DAYS))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (user, token) = state
        .auth
        .register(
            payload.email,
            payload.first_name,
            payload.last_name,
            &payload.password,
        )
        .await?;

    send_welcome_if_needed(&state, &user).await;

    let jar = jar.add(auth_cookie(&state, token));
    Ok((jar, Json(AuthResponse { user })))
}

/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (user, token) = state.auth.login(&payload.email, &payload.password).await?;

    let jar = jar.add(auth_cookie(&state, token));
    Ok((jar, Json(AuthResponse { user })))
}

/// POST /api/auth/logout
///
/// Revokes whatever credentials the request carries and clears both cookies.
/// Succeeds even for an unauthenticated caller.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        state.auth.logout(cookie.value()).await?;
    }
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.storage.delete_session(cookie.value()).await?;
    }

    let jar = jar
        .add(removal_cookie(TOKEN_COOKIE))
        .add(removal_cookie(SESSION_COOKIE));
    Ok((jar, Json(json!({ "success": true }))))
}

/// GET /api/auth/user
async fn current_user(Extension(auth): Extension<AuthUser>) -> Json<AuthResponse> {
    Json(AuthResponse { user: auth.user })
}

/// GET /api/auth/google - redirect to Google's consent screen.
async fn google_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Google login is not configured".to_string()))?;

    let callback_url = format!("{}/api/auth/google/callback", state.config.server_url);
    let url = google.authorize_url(
        &callback_url,
        &state.config.frontend_url,
        &state.config.session_secret,
    )?;

    tracing::info!("Starting Google OAuth flow");
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// GET /api/auth/google/callback
///
/// Exchanges the code, upserts the user, creates a server-side session and
/// redirects back to the frontend. OAuth failures redirect with `?error=`
/// instead of rendering an API error page.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let frontend_url = params
        .state
        .as_deref()
        .and_then(|s| verify_and_decode_state(s, &state.config.session_secret))
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid or tampered state parameter, falling back to default frontend URL"
            );
            state.config.frontend_url.clone()
        });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let Some(code) = params.code else {
        let redirect = format!("{}?error=missing_code", frontend_url);
        return Ok((jar, Redirect::temporary(&redirect)));
    };

    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Google login is not configured".to_string()))?;

    let callback_url = format!("{}/api/auth/google/callback", state.config.server_url);
    let profile = match google.fetch_profile(&code, &callback_url).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(error = %e, "Google OAuth exchange failed");
            let redirect = format!("{}?error=oauth_failed", frontend_url);
            return Ok((jar, Redirect::temporary(&redirect)));
        }
    };

    let (user, is_new) = state.storage.upsert_oauth_user(profile).await?;
    state.storage.touch_last_login(&user.id).await?;

    tracing::info!(user_id = %user.id, is_new, "Google OAuth login");

    if is_new {
        send_welcome_if_needed(&state, &user).await;
    }

    let now = Utc::now();
    let session = Session {
        sid: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        expires_at: now + Duration::hours(OAUTH_SESSION_TTL_HOURS),
        created_at: now,
    };
    state.storage.create_session(&session).await?;

    let cookie = Cookie::build((SESSION_COOKIE, session.sid))
        .path("/")
        .http_only(true)
        .secure(state.config.cookies_secure())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(OAUTH_SESSION_TTL_HOURS))
        .build();

    Ok((jar.add(cookie), Redirect::temporary(&frontend_url)))
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Seconds until expiry
    pub expires_in: i64,
}

/// GET /api/auth/token - mint a general-purpose embed token.
async fn issue_embed_token(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TokenResponse>> {
    let token = state.tokens.issue_embed_token(&auth.user, "general").await?;
    Ok(Json(TokenResponse {
        token,
        expires_in: EMBED_TOKEN_TTL_HOURS * 3600,
    }))
}

/// GET /api/auth/app-token/{app} - mint an embed token scoped to one tool.
async fn issue_app_token(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(app): Path<String>,
) -> Result<Json<TokenResponse>> {
    if app != "penora" && app != "imagegene" {
        return Err(AppError::BadRequest(format!("Unknown app: {}", app)));
    }

    let token = state.tokens.issue_embed_token(&auth.user, &app).await?;
    Ok(Json(TokenResponse {
        token,
        expires_in: EMBED_TOKEN_TTL_HOURS * 3600,
    }))
}

/// One-shot welcome email, flagged in storage so it never repeats.
async fn send_welcome_if_needed(state: &AppState, user: &User) {
    if user.welcome_email_sent {
        return;
    }

    let first_name = user.first_name.as_deref().unwrap_or("there");
    state.mailer.send_welcome(&user.email, first_name).await;

    if let Err(e) = state.storage.set_welcome_email_sent(&user.id).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to flag welcome email as sent");
    }
}
