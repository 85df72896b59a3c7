//! Thin accessor for the `accounts` collection.
//!
//! Reads an account scoped to its owner and writes its balance. The balance
//! (with its version) is the only account field this service ever writes.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::account::Account,
    store::{ACCOUNTS, DataStore, Query, StoreError},
};

pub struct AccountStore<S> {
    store: Arc<S>,
}

impl<S: DataStore> AccountStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch an account owned by `owner`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: No such account, or it belongs to another user
    /// - `Store`: The remote call failed
    pub async fn get(&self, account_id: Uuid, owner: Uuid) -> Result<Account, AppError> {
        let query = Query::new().eq("id", account_id).eq("user_id", owner);
        let row = self
            .store
            .select(ACCOUNTS, &query)
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::NotFound("Account"))?;

        Ok(serde_json::from_value(row).map_err(StoreError::from)?)
    }

    /// Write a new balance, provided the account is still at the version
    /// `account` was read at.
    ///
    /// The patch is filtered on `version` and bumps it, so a write based on
    /// a stale read matches no rows and fails with `StoreError::Conflict`
    /// instead of silently discarding the other writer's effect. Returns
    /// the account as stored.
    pub async fn set_balance(
        &self,
        account: &Account,
        new_balance: Decimal,
    ) -> Result<Account, AppError> {
        let query = Query::new()
            .eq("id", account.id)
            .eq("version", account.version);
        let patch = json!({
            "balance": new_balance,
            "version": account.version + 1,
        });

        let row = self
            .store
            .update(ACCOUNTS, &query, patch)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::Conflict { table: ACCOUNTS })?;

        Ok(serde_json::from_value(row).map_err(StoreError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::store::memory::MemoryStore;

    fn seed_account(store: &MemoryStore, owner: Uuid, balance: &str) -> Uuid {
        let id = Uuid::new_v4();
        store.seed(
            ACCOUNTS,
            json!({
                "id": id,
                "user_id": owner,
                "name": "Everyday",
                "balance": balance,
                "opening_balance": balance,
                "version": 0,
                "created_at": Utc::now(),
            }),
        );
        id
    }

    #[tokio::test]
    async fn get_is_scoped_to_owner() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let id = seed_account(&store, owner, "10.00");
        let accounts = AccountStore::new(store);

        let account = accounts.get(id, owner).await.unwrap();
        assert_eq!(account.balance, Decimal::new(1000, 2));

        let error = accounts.get(id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound("Account")));
    }

    #[tokio::test]
    async fn set_balance_rejects_stale_version() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let id = seed_account(&store, owner, "10.00");
        let accounts = AccountStore::new(store);
        let read = accounts.get(id, owner).await.unwrap();

        let stored = accounts.set_balance(&read, Decimal::new(15, 0)).await.unwrap();
        assert_eq!(stored.version, read.version + 1);

        let error = accounts
            .set_balance(&read, Decimal::new(20, 0))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Store(StoreError::Conflict { .. })));

        let account = accounts.get(id, owner).await.unwrap();
        assert_eq!(account.balance, Decimal::new(15, 0));
    }

    #[tokio::test]
    async fn same_balance_with_newer_version_is_a_conflict() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let id = seed_account(&store, owner, "10.00");
        let accounts = AccountStore::new(store);
        let read = accounts.get(id, owner).await.unwrap();

        // Two writes that end where they started: the balance matches the
        // read again, the version does not.
        let raised = accounts.set_balance(&read, Decimal::new(11, 0)).await.unwrap();
        accounts.set_balance(&raised, Decimal::new(10, 0)).await.unwrap();

        let error = accounts
            .set_balance(&read, Decimal::new(12, 0))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Store(StoreError::Conflict { .. })));
    }
}
