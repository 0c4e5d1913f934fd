// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod auth;
pub mod credits;
pub mod google;
pub mod mailer;
pub mod tokens;

pub use auth::AuthService;
pub use credits::CreditService;
pub use google::GoogleOAuth;
pub use mailer::Mailer;
pub use tokens::TokenService;
