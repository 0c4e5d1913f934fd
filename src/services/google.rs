// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth client.
//!
//! Handles the authorization redirect, the signed `state` parameter, the
//! code-for-token exchange, and the userinfo fetch.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::models::OauthProfile;

type HmacSha256 = Hmac<Sha256>;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Google OAuth client. Constructed only when client credentials are
/// configured; Google login is disabled otherwise.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Userinfo endpoint response (OpenID Connect).
#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
        }
    }

    /// Build the Google authorization URL with an HMAC-signed state that
    /// carries the frontend URL to return to.
    pub fn authorize_url(
        &self,
        callback_url: &str,
        frontend_url: &str,
        state_key: &[u8],
    ) -> Result<String> {
        let state = sign_state(frontend_url, state_key)?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(callback_url),
            state
        ))
    }

    /// Exchange an authorization code and fetch the user's profile.
    pub async fn fetch_profile(&self, code: &str, callback_url: &str) -> Result<OauthProfile> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", callback_url),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Google token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Google token exchange rejected");
            return Err(AppError::Upstream(format!(
                "Google token exchange rejected ({})",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Google token response unparseable: {}", e)))?;

        let info: UserInfo = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Google userinfo fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Google userinfo unparseable: {}", e)))?;

        let email = info.email.ok_or_else(|| {
            AppError::Upstream("Google profile has no email address".to_string())
        })?;

        Ok(OauthProfile {
            provider_id: info.sub,
            email,
            first_name: info.given_name,
            last_name: info.family_name,
            profile_image_url: info.picture,
        })
    }
}

/// Sign `frontend_url` plus a timestamp into a base64url state parameter.
///
/// Format before encoding: `frontend_url|timestamp_hex|signature_hex`.
pub fn sign_state(frontend_url: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{:x}", frontend_url, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let signed = format!("{}|{}", payload, signature);
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and decode the frontend URL from the OAuth
/// state parameter. Returns `None` on any mismatch or malformed input.
pub fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let frontend_url = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(frontend_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        let secret = b"secret_key";
        let state = sign_state("https://example.com", secret).unwrap();
        let decoded = verify_and_decode_state(&state, secret);
        assert_eq!(decoded, Some("https://example.com".to_string()));
    }

    #[test]
    fn test_state_rejects_wrong_secret() {
        let state = sign_state("https://example.com", b"secret_key").unwrap();
        assert_eq!(verify_and_decode_state(&state, b"wrong_key"), None);
    }

    #[test]
    fn test_state_rejects_tampered_payload() {
        let secret = b"secret_key";
        let state = sign_state("https://example.com", secret).unwrap();

        let decoded = URL_SAFE_NO_PAD.decode(&state).unwrap();
        let tampered = String::from_utf8(decoded)
            .unwrap()
            .replace("example.com", "evil.example");
        let tampered_state = URL_SAFE_NO_PAD.encode(tampered.as_bytes());

        assert_eq!(verify_and_decode_state(&tampered_state, secret), None);
    }

    #[test]
    fn test_state_rejects_malformed_input() {
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_and_decode_state(&encoded, b"secret_key"), None);
        assert_eq!(verify_and_decode_state("not-base64!!!", b"secret_key"), None);
    }

    #[test]
    fn test_authorize_url_contains_signed_state() {
        let google = GoogleOAuth::new("client-id".to_string(), "client-secret".to_string());
        let url = google
            .authorize_url(
                "http://localhost:8080/api/auth/google/callback",
                "http://localhost:5173",
                b"state_key",
            )
            .unwrap();

        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("state="));

        let state = url.split("state=").nth(1).unwrap();
        assert_eq!(
            verify_and_decode_state(state, b"state_key"),
            Some("http://localhost:5173".to_string())
        );
    }
}
