// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for storage and API.

pub mod credits;
pub mod user;

pub use credits::{CreditSnapshot, CreditValue};
pub use user::{AuthProvider, AuthToken, NewUser, OauthProfile, Session, TokenKind, User};
