// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SukuSuku.ai backend API
//!
//! This crate provides the account, credit and embed-token backend for the
//! SukuSuku.ai marketing site and its two externally hosted creator tools,
//! Penora and ImageGene.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::Storage;
use services::{AuthService, CreditService, GoogleOAuth, Mailer, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub auth: AuthService,
    pub tokens: TokenService,
    pub credits: CreditService,
    pub mailer: Mailer,
    /// `None` when Google OAuth credentials are not configured.
    pub google: Option<GoogleOAuth>,
}

impl AppState {
    /// Wire up all services over the given storage backend.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let tokens = TokenService::new(config.jwt_secret.clone(), storage.clone());
        let auth = AuthService::new(storage.clone(), tokens.clone());
        let credits = CreditService::new(&config, storage.clone());
        let mailer = Mailer::new(&config);

        let google = match (&config.google_client_id, &config.google_client_secret) {
            (Some(id), Some(secret)) => Some(GoogleOAuth::new(id.clone(), secret.clone())),
            _ => None,
        };

        Self {
            config,
            storage,
            auth,
            tokens,
            credits,
            mailer,
            google,
        }
    }
}
