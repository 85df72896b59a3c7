//! Balance mutation service - keeps account balances consistent with transactions.
//!
//! This service handles:
//! - Creating, replacing and deleting transactions
//! - Applying and reversing each transaction's signed effect on its account
//! - Serializing balance read-modify-write sequences per account
//! - Undoing a partially applied mutation
//!
//! # Consistency Model
//!
//! The remote store offers independent, non-atomic calls only. Balances are
//! maintained incrementally (one delta per mutation) instead of being
//! recomputed from history on every write:
//!
//! 1. The affected accounts are locked in-process for the whole sequence,
//!    so concurrent requests for one account cannot read a stale balance.
//! 2. The transaction row is written first, then the balance. Balance writes
//!    are compare-and-swap on the account `version`. When another writer got
//!    there first the delta is not re-applied: the balance is recomputed from
//!    the rows (`opening_balance + Σ effects`), which already include this
//!    mutation, and written again, up to `retry_limit` times.
//! 3. When a step fails after the row was written, the row write is undone
//!    and the touched accounts are reconciled before the error is returned,
//!    so a failed call leaves no trace.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    account_locks::{AccountGuard, AccountLocks},
    account_store::AccountStore,
    transaction_store::TransactionStore,
};
use crate::{
    error::AppError,
    models::{
        account::Account,
        transaction::{NewTransaction, Transaction, TransactionPatch, TransactionRequest},
    },
    store::{DataStore, StoreError},
};

pub struct BalanceMutationService<S> {
    accounts: AccountStore<S>,
    transactions: TransactionStore<S>,
    locks: AccountLocks,
    retry_limit: u32,
}

fn is_conflict(error: &AppError) -> bool {
    matches!(error, AppError::Store(StoreError::Conflict { .. }))
}

/// `balance + delta`, or a validation error if it does not fit a `Decimal`.
fn shifted(balance: Decimal, delta: Decimal) -> Result<Decimal, AppError> {
    balance
        .checked_add(delta)
        .ok_or_else(|| AppError::Validation("Resulting balance is out of range".to_string()))
}

impl<S: DataStore> BalanceMutationService<S> {
    pub fn new(store: Arc<S>, retry_limit: u32) -> Self {
        Self {
            accounts: AccountStore::new(store.clone()),
            transactions: TransactionStore::new(store),
            locks: AccountLocks::new(),
            retry_limit,
        }
    }

    /// Record a new transaction and apply its effect to its account.
    ///
    /// # Process
    ///
    /// 1. Lock the account
    /// 2. Read the account (owner-scoped)
    /// 3. Insert the transaction with `balance_after = balance + effect`
    /// 4. Write the new balance
    ///
    /// # Errors
    ///
    /// - `Validation`: Out of range amount, overlong description, or a
    ///   balance that would overflow
    /// - `NotFound`: Account doesn't exist or belongs to another user
    /// - `Store`: A remote call failed (the inserted row is removed again)
    pub async fn create_transaction(
        &self,
        owner: Uuid,
        request: TransactionRequest,
    ) -> Result<Transaction, AppError> {
        request.validate()?;
        let _guard = self.locks.acquire(&[request.account_id]).await;

        let account = self.accounts.get(request.account_id, owner).await?;
        let effect = request.effect();
        let planned = shifted(account.balance, effect)?;

        let mut transaction = self
            .transactions
            .insert(&NewTransaction::new(owner, &request, planned))
            .await?;

        let outcome = async {
            let balance = self.shift_balance(account, effect, owner).await?;
            if balance != planned {
                self.transactions
                    .set_balance_after(transaction.id, owner, balance)
                    .await?;
            }
            Ok::<_, AppError>(balance)
        }
        .await;

        match outcome {
            Ok(balance) => {
                transaction.balance_after = balance;
                tracing::info!(
                    account_id = %request.account_id,
                    transaction_id = %transaction.id,
                    %effect,
                    %balance,
                    "transaction created"
                );
                Ok(transaction)
            }
            Err(error) => {
                if let Err(undo) = self.transactions.discard(transaction.id, owner).await {
                    tracing::error!(
                        transaction_id = %transaction.id,
                        error = %undo,
                        "could not remove transaction after failed create"
                    );
                }
                self.repair(owner, &[request.account_id]).await;
                Err(error)
            }
        }
    }

    /// Replace a transaction, moving its effect if the amount, kind or
    /// account changed.
    ///
    /// The old effect is reversed from the old account and the new effect
    /// applied to the new account. When both are the same account the two
    /// deltas are combined into one balance write.
    ///
    /// # Errors
    ///
    /// - `Validation`: Invalid replacement values, or a balance that would
    ///   overflow
    /// - `NotFound`: Transaction, old account or new account missing
    /// - `Store`: A remote call failed (the row is put back and touched
    ///   accounts are reconciled)
    pub async fn update_transaction(
        &self,
        owner: Uuid,
        transaction_id: Uuid,
        request: TransactionRequest,
    ) -> Result<Transaction, AppError> {
        request.validate()?;
        let (_guard, existing) = self
            .lock_transaction(owner, transaction_id, Some(request.account_id))
            .await?;

        // Both accounts are checked before anything is written.
        let source = self.accounts.get(existing.account_id, owner).await?;
        let destination = if existing.account_id == request.account_id {
            None
        } else {
            Some(self.accounts.get(request.account_id, owner).await?)
        };

        let old_effect = existing.effect();
        let new_effect = request.effect();
        let net_effect = shifted(new_effect, -old_effect)?;
        let planned = match &destination {
            None => shifted(source.balance, net_effect)?,
            Some(destination) => {
                shifted(source.balance, -old_effect)?;
                shifted(destination.balance, new_effect)?
            }
        };

        let mut transaction = self
            .transactions
            .replace(&existing, &TransactionPatch::new(&request, planned))
            .await?;
        let touched = [existing.account_id, request.account_id];

        let outcome = async {
            let balance = match destination {
                None => self.shift_balance(source, net_effect, owner).await?,
                Some(destination) => {
                    self.shift_balance(source, -old_effect, owner).await?;
                    self.shift_balance(destination, new_effect, owner).await?
                }
            };
            if balance != planned {
                self.transactions
                    .set_balance_after(transaction_id, owner, balance)
                    .await?;
            }
            Ok::<_, AppError>(balance)
        }
        .await;

        match outcome {
            Ok(balance) => {
                transaction.balance_after = balance;
                tracing::info!(
                    transaction_id = %transaction_id,
                    from_account = %existing.account_id,
                    to_account = %request.account_id,
                    %old_effect,
                    %new_effect,
                    balance_after = %balance,
                    "transaction updated"
                );
                Ok(transaction)
            }
            Err(error) => {
                if let Err(undo) = self.transactions.revert(&existing).await {
                    tracing::error!(
                        %transaction_id,
                        error = %undo,
                        "could not restore transaction after failed update"
                    );
                }
                self.repair(owner, &touched).await;
                Err(error)
            }
        }
    }

    /// Reverse a transaction's effect and remove it.
    ///
    /// Returns the removed transaction.
    pub async fn delete_transaction(
        &self,
        owner: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, AppError> {
        let (_guard, existing) = self
            .lock_transaction(owner, transaction_id, None)
            .await?;

        let account = self.accounts.get(existing.account_id, owner).await?;
        let effect = existing.effect();
        shifted(account.balance, -effect)?;

        self.transactions.delete(&existing).await?;

        match self.shift_balance(account, -effect, owner).await {
            Ok(balance) => {
                tracing::info!(
                    account_id = %existing.account_id,
                    transaction_id = %transaction_id,
                    reversed = %effect,
                    %balance,
                    "transaction deleted"
                );
                Ok(existing)
            }
            Err(error) => {
                if let Err(undo) = self.transactions.reinsert(&existing).await {
                    tracing::error!(
                        %transaction_id,
                        error = %undo,
                        "could not restore transaction after failed delete"
                    );
                }
                self.repair(owner, &[existing.account_id]).await;
                Err(error)
            }
        }
    }

    /// Recompute an account's balance from its transactions and store it if
    /// it drifted.
    ///
    /// Idempotent; safe to call at any time.
    pub async fn reconcile_account(&self, owner: Uuid, account_id: Uuid) -> Result<Account, AppError> {
        let _guard = self.locks.acquire(&[account_id]).await;
        self.reconcile_locked(owner, account_id).await
    }

    pub async fn get_account(&self, owner: Uuid, account_id: Uuid) -> Result<Account, AppError> {
        self.accounts.get(account_id, owner).await
    }

    /// Every transaction of `owner`, ordered by date.
    pub async fn list_transactions(&self, owner: Uuid) -> Result<Vec<Transaction>, AppError> {
        self.transactions.list_for_owner(owner).await
    }

    /// Lock the account(s) a transaction touches and re-read it under the lock.
    ///
    /// The first read is unlocked, so a concurrent update may have moved the
    /// transaction to another account before the lock was taken; in that
    /// case the locks are released and taken again.
    async fn lock_transaction(
        &self,
        owner: Uuid,
        transaction_id: Uuid,
        moving_to: Option<Uuid>,
    ) -> Result<(AccountGuard, Transaction), AppError> {
        let mut account_id = self.transactions.get(transaction_id, owner).await?.account_id;

        loop {
            let mut ids = vec![account_id];
            ids.extend(moving_to);
            let guard = self.locks.acquire(&ids).await;

            let current = self.transactions.get(transaction_id, owner).await?;
            if current.account_id == account_id {
                return Ok((guard, current));
            }
            account_id = current.account_id;
        }
    }

    /// Add `delta` to the balance `account` was read with.
    ///
    /// The row carrying `delta` is already written. If the account moved on
    /// since it was read, the balance is recomputed from the rows instead,
    /// which counts `delta` exactly once whatever the other writer did.
    /// Returns the balance that was stored.
    async fn shift_balance(
        &self,
        account: Account,
        delta: Decimal,
        owner: Uuid,
    ) -> Result<Decimal, AppError> {
        let account_id = account.id;
        let mut target = shifted(account.balance, delta)?;
        let mut current = account;
        let mut attempt = 0;

        loop {
            match self.accounts.set_balance(&current, target).await {
                Ok(stored) => return Ok(stored.balance),
                Err(error) if is_conflict(&error) && attempt < self.retry_limit => {
                    attempt += 1;
                    tracing::warn!(
                        %account_id,
                        attempt,
                        "balance changed outside this service, recomputing"
                    );
                    current = self.accounts.get(account_id, owner).await?;
                    target = self.derived_balance(&current, owner).await?;
                    if current.balance == target {
                        return Ok(target);
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// `opening_balance + Σ effects` of the rows now referencing `account`.
    ///
    /// `account` must be read before the rows, so a row written after the
    /// read shows up as a version conflict on the following write.
    async fn derived_balance(&self, account: &Account, owner: Uuid) -> Result<Decimal, AppError> {
        self.transactions
            .list_for_account(account.id, owner)
            .await?
            .iter()
            .try_fold(account.opening_balance, |total, transaction| {
                shifted(total, transaction.effect())
            })
    }

    async fn reconcile_locked(&self, owner: Uuid, account_id: Uuid) -> Result<Account, AppError> {
        let mut attempt = 0;
        loop {
            let account = self.accounts.get(account_id, owner).await?;
            let expected = self.derived_balance(&account, owner).await?;
            if account.balance == expected {
                return Ok(account);
            }

            tracing::warn!(
                %account_id,
                stored = %account.balance,
                %expected,
                "balance drifted, reconciling"
            );
            match self.accounts.set_balance(&account, expected).await {
                Ok(account) => return Ok(account),
                Err(error) if is_conflict(&error) && attempt < self.retry_limit => attempt += 1,
                Err(error) => return Err(error),
            }
        }
    }

    /// Best-effort reconciliation after a partially applied mutation.
    ///
    /// The caller already holds the locks for `account_ids`.
    async fn repair(&self, owner: Uuid, account_ids: &[Uuid]) {
        let mut ids = account_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        for account_id in ids {
            if let Err(error) = self.reconcile_locked(owner, account_id).await {
                tracing::error!(
                    %account_id,
                    %error,
                    "could not reconcile balance after failed mutation"
                );
            }
        }
    }
}
