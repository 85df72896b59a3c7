//! In-memory [`DataStore`] for tests.
//!
//! Mimics the remote store closely enough for the balance logic: exact-match
//! filters (numeric columns compare by value), server-side ordering, generated
//! `id`/`created_at` on insert. Every call yields to the scheduler first so
//! concurrent callers interleave between calls, as they would over the network.

use std::{
    cmp::Ordering,
    collections::HashMap,
    str::FromStr,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{DataStore, Order, Query, Row, StoreError};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<&'static str, Vec<Row>>,
    failures: HashMap<(Operation, &'static str), usize>,
    interference: HashMap<(Operation, &'static str), Vec<(Query, Row)>>,
    calls: HashMap<(Operation, &'static str), usize>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a row in place without going through `insert`.
    pub fn seed(&self, table: &'static str, row: Row) {
        self.lock().tables.entry(table).or_default().push(row);
    }

    /// Snapshot of every row in `table`.
    pub fn rows(&self, table: &'static str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Make the next `operation` on `table` fail with a 503.
    pub fn fail_next(&self, operation: Operation, table: &'static str) {
        *self.lock().failures.entry((operation, table)).or_default() += 1;
    }

    /// Just before the next `operation` on `table` runs, patch the rows
    /// matching `query` as if another client had written them.
    pub fn interfere_next(
        &self,
        operation: Operation,
        table: &'static str,
        query: Query,
        patch: Row,
    ) {
        self.lock()
            .interference
            .entry((operation, table))
            .or_default()
            .push((query, patch));
    }

    /// Number of `operation` calls made against `table` so far.
    pub fn calls(&self, operation: Operation, table: &'static str) -> usize {
        self.lock()
            .calls
            .get(&(operation, table))
            .copied()
            .unwrap_or_default()
    }

    fn begin(
        &self,
        operation: Operation,
        table: &'static str,
    ) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let mut inner = self.lock();
        *inner.calls.entry((operation, table)).or_default() += 1;

        if let Some(pending) = inner.failures.get_mut(&(operation, table)) {
            if *pending > 0 {
                *pending -= 1;
                return Err(StoreError::Status {
                    status: 503,
                    message: format!("injected {operation:?} failure on {table}"),
                });
            }
        }

        if let Some((query, patch)) = inner
            .interference
            .get_mut(&(operation, table))
            .and_then(Vec::pop)
        {
            for row in inner.tables.entry(table).or_default().iter_mut() {
                if matches(row, &query) {
                    merge(row, &patch);
                }
            }
        }

        Ok(inner)
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => Decimal::from_str(text).ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Exact match, except numbers compare by value (`1200.0` matches `1200.00`).
fn matches(row: &Row, query: &Query) -> bool {
    query.filters().iter().all(|(column, expected)| {
        let Some(actual) = row.get(column) else {
            return false;
        };

        if let (Some(actual), Ok(expected)) = (as_decimal(actual), Decimal::from_str(expected)) {
            return actual == expected;
        }
        as_text(actual) == *expected
    })
}

fn compare(left: &Value, right: &Value) -> Ordering {
    match (as_decimal(left), as_decimal(right)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => as_text(left).cmp(&as_text(right)),
    }
}

fn merge(row: &mut Row, patch: &Row) {
    if let (Some(target), Some(source)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
}

impl DataStore for MemoryStore {
    async fn select(&self, table: &'static str, query: &Query) -> Result<Vec<Row>, StoreError> {
        tokio::task::yield_now().await;
        let inner = self.begin(Operation::Select, table)?;

        let mut rows: Vec<Row> = inner
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| matches(row, query)).cloned().collect())
            .unwrap_or_default();

        if let Some((column, order)) = query.order() {
            rows.sort_by(|a, b| {
                let ordering = compare(&a[column], &b[column]);
                match order {
                    Order::Ascending => ordering,
                    Order::Descending => ordering.reverse(),
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: &'static str, row: Row) -> Result<Row, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::Insert, table)?;

        let mut stored = row;
        if let Some(object) = stored.as_object_mut() {
            object
                .entry("id")
                .or_insert_with(|| json!(Uuid::new_v4()));
            object
                .entry("created_at")
                .or_insert_with(|| json!(Utc::now()));
        }

        inner.tables.entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: &'static str,
        query: &Query,
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::Update, table)?;

        let mut updated = Vec::new();
        for row in inner.tables.entry(table).or_default().iter_mut() {
            if matches(row, query) {
                merge(row, &patch);
                updated.push(row.clone());
            }
        }

        Ok(updated)
    }

    async fn delete(&self, table: &'static str, query: &Query) -> Result<Vec<Row>, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.begin(Operation::Delete, table)?;

        let rows = inner.tables.entry(table).or_default();
        let (removed, kept): (Vec<Row>, Vec<Row>) =
            rows.drain(..).partition(|row| matches(row, query));
        *rows = kept;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn numeric_filters_compare_by_value() {
        let store = MemoryStore::new();
        store.seed("accounts", json!({ "id": "a", "balance": "1200.00" }));

        let query = Query::new().eq("id", "a").eq("balance", Decimal::new(1200, 0));
        let rows = store.select("accounts", &query).await.unwrap();
        assert_eq!(rows.len(), 1);

        let stale = Query::new().eq("balance", "1199.99");
        assert!(store.select("accounts", &stale).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next(Operation::Insert, "accounts");

        assert!(store.insert("accounts", json!({})).await.is_err());
        assert!(store.insert("accounts", json!({})).await.is_ok());
        assert_eq!(store.calls(Operation::Insert, "accounts"), 2);
    }

    #[tokio::test]
    async fn select_orders_by_column() {
        let store = MemoryStore::new();
        store.seed("transactions", json!({ "date": "2025-03-01" }));
        store.seed("transactions", json!({ "date": "2025-01-15" }));

        let query = Query::new().order_by("date", Order::Ascending);
        let rows = store.select("transactions", &query).await.unwrap();
        assert_eq!(rows[0]["date"], "2025-01-15");
    }
}
