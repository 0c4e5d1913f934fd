// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound links into the externally hosted tools.
//!
//! Each link is a redirect carrying the user's identity in the query string
//! so the tool can greet the user without a shared session. These are
//! convenience hand-offs; the embed-token flow is the authenticated path.

use axum::{
    extract::{Extension, State},
    response::Redirect,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/penora_link", get(penora_link))
        .route("/imagegene_link", get(imagegene_link))
}

fn tool_redirect(base_url: Option<&str>, tool: &str, user: &User) -> Result<Redirect> {
    let base = base_url
        .ok_or_else(|| AppError::BadRequest(format!("{} is not configured", tool)))?;

    let url = format!(
        "{}?user_id={}&email={}&first_name={}&last_name={}",
        base,
        urlencoding::encode(&user.id),
        urlencoding::encode(&user.email),
        urlencoding::encode(user.first_name.as_deref().unwrap_or("")),
        urlencoding::encode(user.last_name.as_deref().unwrap_or("")),
    );

    tracing::info!(user_id = %user.id, tool, "Redirecting to external tool");
    Ok(Redirect::temporary(&url))
}

/// GET /penora_link
async fn penora_link(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Redirect> {
    tool_redirect(state.config.penora_base_url.as_deref(), "Penora", &auth.user)
}

/// GET /imagegene_link
async fn imagegene_link(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Redirect> {
    tool_redirect(
        state.config.imagegene_base_url.as_deref(),
        "ImageGene",
        &auth.user,
    )
}
