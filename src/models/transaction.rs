//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `TransactionKind`: Income or expense, and the sign it carries
//! - `Transaction`: Store row representing a transaction
//! - `TransactionRequest`: Body for create and update
//! - `TransactionResponse` / `Confirmation`: Bodies returned to clients

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Longest description accepted on a transaction.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Largest amount the `NUMERIC(14, 2)` column holds, in cents.
const MAX_AMOUNT_CENTS: i64 = 99_999_999_999_999;

/// Decimal places the amount column keeps.
const AMOUNT_SCALE: u32 = 2;

/// Direction of a transaction relative to its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// The amount this kind of transaction contributes to a balance.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        }
    }

    /// Name used on the wire and in the `type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }
}

/// Represents a transaction row from the `transactions` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub id: Uuid,

    /// Owner of the transaction (always the owner of its account)
    pub user_id: Uuid,

    /// Account whose balance this transaction moves
    pub account_id: Uuid,

    /// Optional category, lookup only
    pub category_id: Option<Uuid>,

    /// Calendar date the user assigned to the transaction
    pub date: NaiveDate,

    pub description: Option<String>,

    /// Non-negative amount; the sign comes from `kind`
    pub amount: Decimal,

    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Account balance right after this transaction's effect was applied
    ///
    /// This is a snapshot in *write order*, not a running balance ordered
    /// by `date`. Back-dated transactions do not shift the snapshots of
    /// transactions written before them.
    pub balance_after: Decimal,

    /// When the row was written
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect of this transaction on its account.
    pub fn effect(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

/// Request body for creating or replacing a transaction.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "category_id": "770e8400-e29b-41d4-a716-446655440002",
///   "date": "2025-12-20",
///   "description": "Salary",
///   "amount": "200.00",
///   "type": "INCOME"
/// }
/// ```
///
/// On update the whole body replaces the editable fields, including
/// `account_id` (which moves the transaction to another account).
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    pub account_id: Uuid,

    #[serde(default)]
    pub category_id: Option<Uuid>,

    pub date: NaiveDate,

    #[serde(default)]
    pub description: Option<String>,

    pub amount: Decimal,

    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

impl TransactionRequest {
    /// Signed effect the requested transaction would have.
    pub fn effect(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    /// Reject payloads that are well-formed JSON but not acceptable values.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount < Decimal::ZERO {
            return Err(AppError::Validation(
                "Amount must not be negative".to_string(),
            ));
        }

        let max_amount = Decimal::new(MAX_AMOUNT_CENTS, AMOUNT_SCALE);
        if self.amount > max_amount {
            return Err(AppError::Validation(format!(
                "Amount must be at most {max_amount}"
            )));
        }

        if self.amount.normalize().scale() > AMOUNT_SCALE {
            return Err(AppError::Validation(format!(
                "Amount must have at most {AMOUNT_SCALE} decimal places"
            )));
        }

        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(AppError::Validation(format!(
                    "Description must be at most {MAX_DESCRIPTION_LEN} characters"
                )));
            }
        }

        Ok(())
    }
}

/// Row written when a transaction is first inserted.
///
/// `id` and `created_at` are generated by the store.
#[derive(Debug, Serialize)]
pub struct NewTransaction<'a> {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub date: NaiveDate,
    pub description: Option<&'a str>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub balance_after: Decimal,
}

impl<'a> NewTransaction<'a> {
    pub fn new(owner: Uuid, request: &'a TransactionRequest, balance_after: Decimal) -> Self {
        Self {
            user_id: owner,
            account_id: request.account_id,
            category_id: request.category_id,
            date: request.date,
            description: request.description.as_deref(),
            amount: request.amount,
            kind: request.kind,
            balance_after,
        }
    }
}

/// Patch written when a transaction is replaced.
///
/// `category_id` and `description` are always sent so clearing them works.
#[derive(Debug, Serialize)]
pub struct TransactionPatch<'a> {
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub date: NaiveDate,
    pub description: Option<&'a str>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub balance_after: Decimal,
}

impl<'a> TransactionPatch<'a> {
    pub fn new(request: &'a TransactionRequest, balance_after: Decimal) -> Self {
        Self {
            account_id: request.account_id,
            category_id: request.category_id,
            date: request.date,
            description: request.description.as_deref(),
            amount: request.amount,
            kind: request.kind,
            balance_after,
        }
    }

    /// Patch that puts a transaction's previous values back.
    pub fn restore(original: &'a Transaction) -> Self {
        Self {
            account_id: original.account_id,
            category_id: original.category_id,
            date: original.date,
            description: original.description.as_deref(),
            amount: original.amount,
            kind: original.kind,
            balance_after: original.balance_after,
        }
    }
}

/// Response returned for transaction reads and creation.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "880e8400-e29b-41d4-a716-446655440003",
///   "account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "category_id": null,
///   "date": "2025-12-20",
///   "description": "Salary",
///   "amount": "200.00",
///   "type": "INCOME",
///   "balance_after": "1200.00",
///   "created_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            account_id: transaction.account_id,
            category_id: transaction.category_id,
            date: transaction.date,
            description: transaction.description,
            amount: transaction.amount,
            kind: transaction.kind,
            balance_after: transaction.balance_after,
            created_at: transaction.created_at,
        }
    }
}

/// Plain acknowledgement for update and delete.
#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub message: String,
}

impl Confirmation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
