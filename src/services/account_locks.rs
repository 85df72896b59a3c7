//! Per-account mutual exclusion.
//!
//! The store has no row locks, so every read-modify-write of a balance runs
//! while holding the account's lock here. Operations touching two accounts
//! take both locks in ascending id order.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Held locks; dropping it releases every account it covers.
#[derive(Debug)]
pub struct AccountGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every account in `ids` (duplicates are fine).
    pub async fn acquire(&self, ids: &[Uuid]) -> AccountGuard {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only the map refers to are idle.
            locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            ids.iter()
                .map(|id| locks.entry(*id).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        AccountGuard { _guards: guards }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
