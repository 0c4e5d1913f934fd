// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credit balance and sync routes.

use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::credits::CreditsResponse;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/credits", get(get_credits))
        .route("/api/user/credits/update", post(update_credits))
        .route("/api/credits/sync", post(sync_credits))
        .route("/api/penora/credits/{user_id}", get(penora_credits))
        .route("/api/penora/add-credits", post(penora_add_credits))
}

/// GET /api/user/credits
///
/// Reconciled view: live remote balances where reachable, stored values
/// otherwise. Always 200, even with both remotes down.
async fn get_credits(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Json<CreditsResponse> {
    let snapshot = state.credits.reconcile(&auth.user).await;
    Json(snapshot.into())
}

#[derive(Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub penora_credits_used: Option<i64>,
    #[serde(default)]
    pub imagegene_credits_used: Option<i64>,
    /// Client-side timestamp, echoed back when present.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub penora_credits: i64,
    pub imagegene_credits: i64,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/credits/sync
///
/// Usage report from an embedded tool: decrements stored balances, floored
/// at zero. Negative amounts are rejected.
async fn sync_credits(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    if payload.penora_credits_used.is_some_and(|v| v < 0)
        || payload.imagegene_credits_used.is_some_and(|v| v < 0)
    {
        return Err(AppError::BadRequest(
            "Credit usage amounts must be non-negative".to_string(),
        ));
    }

    let updated = state
        .credits
        .apply_usage(
            &auth.user,
            payload.penora_credits_used,
            payload.imagegene_credits_used,
        )
        .await?;

    Ok(Json(SyncResponse {
        success: true,
        penora_credits: updated.penora_or_default(),
        imagegene_credits: updated.imagegene_or_default(),
        timestamp: payload.timestamp.unwrap_or_else(Utc::now),
    }))
}

#[derive(Deserialize)]
pub struct UpdateCreditsRequest {
    #[serde(default)]
    pub penora_credits: Option<i64>,
    #[serde(default)]
    pub imagegene_credits: Option<i64>,
}

#[derive(Serialize)]
pub struct UpdateCreditsResponse {
    pub success: bool,
    pub penora_credits: i64,
    pub imagegene_credits: i64,
}

/// POST /api/user/credits/update
///
/// Absolute balance assignment, used by the dashboard after a purchase.
async fn update_credits(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateCreditsRequest>,
) -> Result<Json<UpdateCreditsResponse>> {
    if payload.penora_credits.is_none() && payload.imagegene_credits.is_none() {
        return Err(AppError::BadRequest(
            "At least one balance must be provided".to_string(),
        ));
    }
    if payload.penora_credits.is_some_and(|v| v < 0)
        || payload.imagegene_credits.is_some_and(|v| v < 0)
    {
        return Err(AppError::BadRequest(
            "Credit balances must be non-negative".to_string(),
        ));
    }

    let updated = state
        .storage
        .update_user_credits(
            &auth.user.id,
            payload.penora_credits,
            payload.imagegene_credits,
            0,
        )
        .await?;

    Ok(Json(UpdateCreditsResponse {
        success: true,
        penora_credits: updated.penora_or_default(),
        imagegene_credits: updated.imagegene_or_default(),
    }))
}

/// GET /api/penora/credits/{user_id}
///
/// Straight proxy of Penora's account view; the response body is Penora's,
/// not ours. Unlike the reconciled snapshot, a remote failure here is a 502.
async fn penora_credits(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let info = state.credits.penora_user_info(&user_id).await?;
    Ok(Json(info))
}

#[derive(Deserialize)]
pub struct AddCreditsRequest {
    pub user_id: String,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/penora/add-credits
async fn penora_add_credits(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthUser>,
    Json(payload): Json<AddCreditsRequest>,
) -> Result<Json<serde_json::Value>> {
    if payload.amount <= 0 {
        return Err(AppError::BadRequest(
            "Credit amount must be positive".to_string(),
        ));
    }

    let result = state
        .credits
        .penora_add_credits(
            &payload.user_id,
            payload.amount,
            payload.description.as_deref(),
        )
        .await?;
    Ok(Json(result))
}
