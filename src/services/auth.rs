// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;

use crate::db::Storage;
use crate::error::{AppError, Result};
use crate::models::{AuthProvider, NewUser, TokenKind, User};
use crate::services::tokens::TokenService;

/// Registration, login and credential checks for password accounts.
#[derive(Clone)]
pub struct AuthService {
    storage: Arc<dyn Storage>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(storage: Arc<dyn Storage>, tokens: TokenService) -> Self {
        Self { storage, tokens }
    }

    /// Create a password account and mint its first session token.
    /// Fails with `DuplicateEmail` if the address is already registered.
    pub async fn register(
        &self,
        email: String,
        first_name: String,
        last_name: String,
        password: &str,
    ) -> Result<(User, String)> {
        let password_hash = hash_password(password)?;

        let user = self
            .storage
            .create_user(NewUser {
                email,
                password_hash,
                first_name,
                last_name,
            })
            .await?;

        let token = self.tokens.issue_session_token(&user.id).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok((user, token))
    }

    /// Verify credentials and mint a fresh session token.
    ///
    /// An OAuth-only account gets a distinct provider-mismatch error rather
    /// than a generic invalid-credentials one, so the frontend can steer the
    /// user to Google sign-in.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let user = self
            .storage
            .get_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if user.auth_provider != AuthProvider::Password || user.password_hash.is_none() {
            return Err(AppError::ProviderMismatch);
        }

        let hash = user.password_hash.as_deref().unwrap_or_default();
        if !verify_password(password, hash)? {
            return Err(AppError::InvalidCredentials);
        }

        self.storage.touch_last_login(&user.id).await?;

        // Rotate: a login invalidates the user's previous session tokens.
        self.storage
            .delete_user_tokens(&user.id, Some(TokenKind::Session))
            .await?;
        let token = self.tokens.issue_session_token(&user.id).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Revoke a presented session token. Idempotent.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.tokens.revoke(token).await
    }
}

/// Hash a password with argon2id and a random salt.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Malformed password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;

    fn auth_service() -> (AuthService, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let tokens = TokenService::new(
            b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            storage.clone(),
        );
        (AuthService::new(storage.clone(), tokens), storage)
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let (auth, _) = auth_service();

        auth.register(
            "dup@example.com".to_string(),
            "First".to_string(),
            "User".to_string(),
            "password123",
        )
        .await
        .unwrap();

        let err = auth
            .register(
                "dup@example.com".to_string(),
                "Second".to_string(),
                "User".to_string(),
                "password456",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_login_oauth_account_reports_provider_mismatch() {
        let (auth, storage) = auth_service();

        storage
            .upsert_oauth_user(crate::models::OauthProfile {
                provider_id: "google-123".to_string(),
                email: "oauth@example.com".to_string(),
                first_name: Some("O".to_string()),
                last_name: Some("Auth".to_string()),
                profile_image_url: None,
            })
            .await
            .unwrap();

        // Even a "correct-looking" password must not degrade to a generic
        // invalid-credentials error for an account with no password hash.
        let err = auth
            .login("oauth@example.com", "any-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProviderMismatch));
    }

    #[tokio::test]
    async fn test_login_rotates_session_tokens() {
        let (auth, storage) = auth_service();

        let (_, first_token) = auth
            .register(
                "rotate@example.com".to_string(),
                "R".to_string(),
                "T".to_string(),
                "password123",
            )
            .await
            .unwrap();

        let (_, second_token) = auth.login("rotate@example.com", "password123").await.unwrap();

        assert!(storage.get_token(&first_token).await.unwrap().is_none());
        assert!(storage.get_token(&second_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_generic() {
        let (auth, _) = auth_service();

        auth.register(
            "who@example.com".to_string(),
            "W".to_string(),
            "H".to_string(),
            "password123",
        )
        .await
        .unwrap();

        let err = auth.login("who@example.com", "not-it").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = auth.login("nobody@example.com", "anything").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }
}
