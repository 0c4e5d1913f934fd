// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact form relay.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::services::mailer::ContactMessage;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/contact", post(submit_contact))
}

#[derive(Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

/// POST /api/contact
///
/// Validation failures are the only error path. Delivery is best-effort:
/// once the payload is well-formed the caller always sees success, whether
/// or not the mail provider accepted the messages.
async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<serde_json::Value>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let contact = ContactMessage {
        name: payload.name,
        email: payload.email,
        message: payload.message,
    };

    tracing::info!(email = %contact.email, "Contact form submission");
    state.mailer.send_contact(&contact).await;

    Ok(Json(json!({
        "success": true,
        "message": "Thank you for your message. We'll get back to you soon!"
    })))
}
