// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credit snapshot types.

use serde::Serialize;

/// Starting/fallback Penora balance for accounts without a stored value.
pub const DEFAULT_PENORA_CREDITS: i64 = 100;
/// Starting/fallback ImageGene balance for accounts without a stored value.
pub const DEFAULT_IMAGEGENE_CREDITS: i64 = 50;

/// A reconciled credit balance, tagged with the path that produced it.
///
/// `Live` supersedes the stored value for the response but is never written
/// back. `Stale` is the stored value after a remote failure or timeout.
/// `Default` applies when neither a live nor a stored value exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditValue {
    Live(i64),
    Stale(i64),
    Default(i64),
}

impl CreditValue {
    /// The balance to display, regardless of origin.
    pub fn value(&self) -> i64 {
        match *self {
            CreditValue::Live(v) | CreditValue::Stale(v) | CreditValue::Default(v) => v,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, CreditValue::Live(_))
    }
}

/// Derived per-request view of a user's balances. Never persisted.
#[derive(Debug, Clone, Copy)]
pub struct CreditSnapshot {
    pub penora: CreditValue,
    pub imagegene: CreditValue,
    pub total_credits_used: i64,
}

/// Wire form of a credit snapshot.
#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub penora_credits: i64,
    pub imagegene_credits: i64,
    pub total_credits_used: i64,
}

impl From<CreditSnapshot> for CreditsResponse {
    fn from(snapshot: CreditSnapshot) -> Self {
        Self {
            penora_credits: snapshot.penora.value(),
            imagegene_credits: snapshot.imagegene.value(),
            total_credits_used: snapshot.total_credits_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ignores_origin() {
        assert_eq!(CreditValue::Live(5).value(), 5);
        assert_eq!(CreditValue::Stale(5).value(), 5);
        assert_eq!(CreditValue::Default(5).value(), 5);
        assert!(CreditValue::Live(5).is_live());
        assert!(!CreditValue::Stale(5).is_live());
    }
}
