//! Account data models and API response types.
//!
//! This module defines:
//! - `Account`: Store row representing an account
//! - `AccountResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an account row from the `accounts` collection.
///
/// # Ownership
///
/// Each account belongs to exactly one user (`user_id`). Every lookup is
/// scoped to the caller's id, so another user's account is indistinguishable
/// from a missing one.
///
/// # Balance
///
/// `balance` is an incrementally maintained running total. The target
/// invariant is:
///
/// ```text
/// balance == opening_balance + Σ signed effect of every transaction on the account
/// ```
///
/// Only the balance service writes `balance` (and `version` with it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account
    pub id: Uuid,

    /// Owner of the account
    pub user_id: Uuid,

    /// Human-readable name for this account
    pub name: String,

    /// Current running balance
    pub balance: Decimal,

    /// Balance the account was opened with
    ///
    /// Never changes after creation; reconciliation recomputes `balance`
    /// from this plus the transaction set. Older rows without the column
    /// read as zero.
    #[serde(default)]
    pub opening_balance: Decimal,

    /// Incremented on every balance write
    ///
    /// Balance writes are compare-and-swap on this value, so a write based
    /// on a stale read matches no row.
    #[serde(default)]
    pub version: i64,

    /// Timestamp when account was created
    pub created_at: DateTime<Utc>,
}

/// Response body for account endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Everyday",
///   "balance": "1200.00",
///   "opening_balance": "1000.00",
///   "created_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub balance: Decimal,
    pub opening_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Convert a stored Account to an AccountResponse (drops the owner id).
impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            balance: account.balance,
            opening_balance: account.opening_balance,
            created_at: account.created_at,
        }
    }
}
