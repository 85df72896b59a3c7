//! Thin accessor for the `transactions` collection.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::transaction::{NewTransaction, Transaction, TransactionPatch},
    store::{DataStore, Order, Query, Row, StoreError, TRANSACTIONS},
};

pub struct TransactionStore<S> {
    store: Arc<S>,
}

fn decode<T: DeserializeOwned>(row: Row) -> Result<T, AppError> {
    Ok(serde_json::from_value(row).map_err(StoreError::from)?)
}

fn decode_all(rows: Vec<Row>) -> Result<Vec<Transaction>, AppError> {
    rows.into_iter().map(decode).collect()
}

impl<S: DataStore> TransactionStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn scoped(id: Uuid, owner: Uuid) -> Query {
        Query::new().eq("id", id).eq("user_id", owner)
    }

    /// Matches `transaction` only while its effect is what was read.
    fn unchanged(transaction: &Transaction) -> Query {
        Self::scoped(transaction.id, transaction.user_id)
            .eq("account_id", transaction.account_id)
            .eq("amount", transaction.amount)
            .eq("type", transaction.kind.as_str())
    }

    /// Fetch a transaction owned by `owner`, or `NotFound`.
    pub async fn get(&self, id: Uuid, owner: Uuid) -> Result<Transaction, AppError> {
        let row = self
            .store
            .select(TRANSACTIONS, &Self::scoped(id, owner))
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::NotFound("Transaction"))?;

        decode(row)
    }

    pub async fn insert(&self, transaction: &NewTransaction<'_>) -> Result<Transaction, AppError> {
        let row = serde_json::to_value(transaction).map_err(StoreError::from)?;
        decode(self.store.insert(TRANSACTIONS, row).await?)
    }

    /// Overwrite the editable fields of `existing`.
    ///
    /// Fails with `StoreError::Conflict` if the row no longer carries the
    /// account, amount and kind it was read with.
    pub async fn replace(
        &self,
        existing: &Transaction,
        patch: &TransactionPatch<'_>,
    ) -> Result<Transaction, AppError> {
        let patch = serde_json::to_value(patch).map_err(StoreError::from)?;
        let row = self
            .store
            .update(TRANSACTIONS, &Self::unchanged(existing), patch)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::Conflict {
                table: TRANSACTIONS,
            })?;

        decode(row)
    }

    /// Put back the values `original` had before a failed replace.
    pub async fn revert(&self, original: &Transaction) -> Result<(), AppError> {
        let patch = serde_json::to_value(TransactionPatch::restore(original))
            .map_err(StoreError::from)?;
        self.store
            .update(
                TRANSACTIONS,
                &Self::scoped(original.id, original.user_id),
                patch,
            )
            .await?;
        Ok(())
    }

    pub async fn set_balance_after(
        &self,
        id: Uuid,
        owner: Uuid,
        balance_after: Decimal,
    ) -> Result<(), AppError> {
        self.store
            .update(
                TRANSACTIONS,
                &Self::scoped(id, owner),
                json!({ "balance_after": balance_after }),
            )
            .await?;
        Ok(())
    }

    /// Remove `existing`, guarded like [`replace`](Self::replace).
    pub async fn delete(&self, existing: &Transaction) -> Result<(), AppError> {
        let removed = self
            .store
            .delete(TRANSACTIONS, &Self::unchanged(existing))
            .await?;

        if removed.is_empty() {
            return Err(StoreError::Conflict {
                table: TRANSACTIONS,
            }
            .into());
        }
        Ok(())
    }

    /// Remove a row this service just inserted.
    pub async fn discard(&self, id: Uuid, owner: Uuid) -> Result<(), AppError> {
        self.store
            .delete(TRANSACTIONS, &Self::scoped(id, owner))
            .await?;
        Ok(())
    }

    /// Write a removed row back with its original id and timestamps.
    pub async fn reinsert(&self, removed: &Transaction) -> Result<(), AppError> {
        let row = serde_json::to_value(removed).map_err(StoreError::from)?;
        self.store.insert(TRANSACTIONS, row).await?;
        Ok(())
    }

    /// Every transaction of `owner`, oldest `date` first.
    pub async fn list_for_owner(&self, owner: Uuid) -> Result<Vec<Transaction>, AppError> {
        let query = Query::new()
            .eq("user_id", owner)
            .order_by("date", Order::Ascending);
        decode_all(self.store.select(TRANSACTIONS, &query).await?)
    }

    /// Every transaction currently referencing `account_id`.
    pub async fn list_for_account(
        &self,
        account_id: Uuid,
        owner: Uuid,
    ) -> Result<Vec<Transaction>, AppError> {
        let query = Query::new()
            .eq("account_id", account_id)
            .eq("user_id", owner);
        decode_all(self.store.select(TRANSACTIONS, &query).await?)
    }
}
