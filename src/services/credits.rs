// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credit reconciliation between local storage and the two remote tools.
//!
//! Reconciliation is best-effort: each remote is polled once with a bounded
//! timeout, a live value supersedes the stored one in the response (without
//! a write-back), and any failure degrades to the stored value. The two
//! sources are polled independently and may disagree; no retry, no backoff.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::db::Storage;
use crate::error::Result;
use crate::models::credits::{
    CreditSnapshot, CreditValue, DEFAULT_IMAGEGENE_CREDITS, DEFAULT_PENORA_CREDITS,
};
use crate::models::User;

/// Which remote tool a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Penora,
    ImageGene,
}

impl Tool {
    fn name(&self) -> &'static str {
        match self {
            Tool::Penora => "penora",
            Tool::ImageGene => "imagegene",
        }
    }
}

/// Balance payload returned by both tools.
#[derive(Deserialize)]
struct RemoteBalance {
    credits: Option<i64>,
}

/// HTTP client for one remote tool's credit endpoint.
#[derive(Clone)]
struct ToolClient {
    tool: Tool,
    http: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl ToolClient {
    fn new(tool: Tool, base_url: Option<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            tool,
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
            api_key,
        }
    }

    /// Fetch the live balance for a user. Any failure (unconfigured base
    /// URL, network error, timeout, non-2xx, missing field) yields `None`.
    async fn fetch_balance(&self, user_id: &str) -> Option<i64> {
        let base = self.base_url.as_deref()?;
        let url = match self.tool {
            Tool::Penora => format!("{}/api/unified/user-info", base),
            Tool::ImageGene => format!("{}/api/user-credits", base),
        };

        let mut request = self.http.get(&url).query(&[("user_id", user_id)]);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(tool = self.tool.name(), error = %e, "Remote credit fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                tool = self.tool.name(),
                status = %response.status(),
                "Remote credit fetch returned error status"
            );
            return None;
        }

        match response.json::<RemoteBalance>().await {
            Ok(body) => {
                if body.credits.is_none() {
                    tracing::warn!(
                        tool = self.tool.name(),
                        "Remote credit response missing 'credits' field"
                    );
                }
                body.credits
            }
            Err(e) => {
                tracing::warn!(tool = self.tool.name(), error = %e, "Remote credit response unparseable");
                None
            }
        }
    }

    /// Proxy a GET through to the tool, surfacing failures as `Upstream`
    /// (unlike `fetch_balance`, which degrades).
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let request = self.request_base(path)?.query(query);
        self.exchange(request).await
    }

    /// Proxy a POST with a JSON body through to the tool.
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let request = self.request_base_post(path)?.json(body);
        self.exchange(request).await
    }

    fn base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| AppError::BadRequest(format!("{} is not configured", self.tool.name())))
    }

    fn request_base(&self, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}{}", self.base_url()?, path);
        Ok(self.with_key(self.http.get(url)))
    }

    fn request_base_post(&self, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}{}", self.base_url()?, path);
        Ok(self.with_key(self.http.post(url)))
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    async fn exchange(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value> {
        let response = request.send().await.map_err(|e| {
            AppError::Upstream(format!("{} request failed: {}", self.tool.name(), e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "{} returned {}",
                self.tool.name(),
                status
            )));
        }

        response.json().await.map_err(|e| {
            AppError::Upstream(format!("{} response unparseable: {}", self.tool.name(), e))
        })
    }
}

/// Merges stored balances with live remote values and applies usage reports.
#[derive(Clone)]
pub struct CreditService {
    storage: Arc<dyn Storage>,
    penora: ToolClient,
    imagegene: ToolClient,
}

impl CreditService {
    pub fn new(config: &Config, storage: Arc<dyn Storage>) -> Self {
        let timeout = Duration::from_secs(config.remote_timeout_secs);
        Self {
            storage,
            penora: ToolClient::new(
                Tool::Penora,
                config.penora_base_url.clone(),
                config.penora_api_key.clone(),
                timeout,
            ),
            imagegene: ToolClient::new(
                Tool::ImageGene,
                config.imagegene_base_url.clone(),
                None,
                timeout,
            ),
        }
    }

    /// Build the credit snapshot for a user: live remote values when
    /// reachable, stored values otherwise, hardcoded defaults when neither
    /// exists. Never fails on remote errors.
    pub async fn reconcile(&self, user: &User) -> CreditSnapshot {
        let (live_penora, live_imagegene) = tokio::join!(
            self.penora.fetch_balance(&user.id),
            self.imagegene.fetch_balance(&user.id),
        );

        let penora = merge(live_penora, user.penora_credits, DEFAULT_PENORA_CREDITS);
        let imagegene = merge(
            live_imagegene,
            user.imagegene_credits,
            DEFAULT_IMAGEGENE_CREDITS,
        );

        tracing::debug!(
            user_id = %user.id,
            penora = penora.value(),
            penora_live = penora.is_live(),
            imagegene = imagegene.value(),
            imagegene_live = imagegene.is_live(),
            "Credits reconciled"
        );

        CreditSnapshot {
            penora,
            imagegene,
            total_credits_used: user.total_credits_used,
        }
    }

    /// Apply a usage report from an external tool: subtract the reported
    /// amounts from the stored balances, floored at zero, and persist.
    ///
    /// There is no idempotency key; a duplicated sync call double-decrements.
    /// The read-modify-write also has no locking, so two concurrent syncs
    /// for one user can lose an update.
    pub async fn apply_usage(
        &self,
        user: &User,
        penora_used: Option<i64>,
        imagegene_used: Option<i64>,
    ) -> Result<User> {
        let new_penora = penora_used
            .filter(|&used| used > 0)
            .map(|used| user.penora_or_default().saturating_sub(used).max(0));
        let new_imagegene = imagegene_used
            .filter(|&used| used > 0)
            .map(|used| user.imagegene_or_default().saturating_sub(used).max(0));

        // Saturating: two near-i64::MAX reports must not overflow the delta.
        let used_delta = penora_used
            .unwrap_or(0)
            .max(0)
            .saturating_add(imagegene_used.unwrap_or(0).max(0));

        let updated = self
            .storage
            .update_user_credits(&user.id, new_penora, new_imagegene, used_delta)
            .await?;

        tracing::info!(
            user_id = %user.id,
            penora = ?updated.penora_credits,
            imagegene = ?updated.imagegene_credits,
            "Credits synced"
        );
        Ok(updated)
    }

    /// Proxy Penora's account view for a user, passing its JSON through
    /// unchanged. Remote failures surface as `Upstream`.
    pub async fn penora_user_info(&self, user_id: &str) -> Result<serde_json::Value> {
        self.penora
            .get_json("/api/unified/user-info", &[("user_id", user_id)])
            .await
    }

    /// Proxy a credit purchase into Penora on a user's behalf.
    pub async fn penora_add_credits(
        &self,
        user_id: &str,
        amount: i64,
        description: Option<&str>,
    ) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "user_id": user_id,
            "amount": amount,
            "transaction_type": "purchase",
            "description": description,
        });
        self.penora.post_json("/api/unified/add-credits", &body).await
    }
}

fn merge(live: Option<i64>, stored: Option<i64>, default: i64) -> CreditValue {
    match (live, stored) {
        (Some(v), _) => CreditValue::Live(v),
        (None, Some(v)) => CreditValue::Stale(v),
        (None, None) => CreditValue::Default(default),
    }
}
