//! Remote data-access layer.
//!
//! All durable state lives in a remote relational store reached over REST.
//! The store offers four independent, non-atomic operations against a table:
//! `select`, `insert`, `update` and `delete`. There are no multi-statement
//! transactions and no row locks, so anything built on top must bring its
//! own serialization (see `services::account_locks`).

pub mod rest;

#[cfg(test)]
pub mod memory;

use std::future::Future;

use serde_json::Value;

/// A single row as returned by the store (a JSON object).
pub type Row = Value;

/// Name of the accounts collection.
pub const ACCOUNTS: &str = "accounts";
/// Name of the transactions collection.
pub const TRANSACTIONS: &str = "transactions";
/// Name of the users collection (read by authentication only).
pub const USERS: &str = "users";

/// Errors raised by the data-access client.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request never produced a response (connect, timeout, TLS, ...).
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A row could not be (de)serialized.
    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL is not a valid URL.
    #[error("invalid store url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A guarded write matched no rows because the row changed underneath it.
    #[error("concurrent modification on {table}")]
    Conflict { table: &'static str },

    /// A write that must return a row returned none.
    #[error("store returned no rows for {table}")]
    EmptyResponse { table: &'static str },
}

/// Sort direction for server-side ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Exact-match predicates plus optional ordering for a store call.
///
/// ```ignore
/// let query = Query::new()
///     .eq("user_id", owner)
///     .order_by("date", Order::Ascending);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column` to equal `value`.
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    /// Order results by `column` (only meaningful for `select`).
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    pub fn order(&self) -> Option<(&str, Order)> {
        self.order.as_ref().map(|(column, order)| (column.as_str(), *order))
    }

    /// Encode as PostgREST query parameters (`col=eq.value`, `order=col.asc`).
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters()
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{value}")))
            .collect();

        if let Some((column, order)) = self.order() {
            let direction = match order {
                Order::Ascending => "asc",
                Order::Descending => "desc",
            };
            params.push(("order".to_string(), format!("{column}.{direction}")));
        }

        params
    }
}

/// The generic data-access client.
///
/// Each call is independent: a failure part way through a sequence of calls
/// leaves every earlier call committed.
pub trait DataStore: Send + Sync + 'static {
    /// Fetch every row of `table` matching `query`.
    fn select(
        &self,
        table: &'static str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;

    /// Insert `row` and return it as stored (with generated columns filled in).
    fn insert(
        &self,
        table: &'static str,
        row: Row,
    ) -> impl Future<Output = Result<Row, StoreError>> + Send;

    /// Apply `patch` to every matching row and return the updated rows.
    fn update(
        &self,
        table: &'static str,
        query: &Query,
        patch: Row,
    ) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;

    /// Remove every matching row and return the removed rows.
    fn delete(
        &self,
        table: &'static str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;
}
