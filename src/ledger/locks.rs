//! Per-account serialization
//!
//! Every balance-mutating operation holds an exclusive lock scoped to the
//! account number for its whole read-check-write sequence. Two-account
//! operations (transfer, transfer cancellation) acquire both locks in
//! ascending canonical-digits order so concurrent opposite-direction
//! transfers cannot deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::AccountNumber;

/// Lock table keyed by canonical account digits.
#[derive(Debug, Default)]
pub struct AccountLocks {
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: String) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().expect("lock table poisoned");
        map.entry(key).or_default().clone()
    }

    /// Exclusive lock on one account.
    pub async fn lock(&self, account: &AccountNumber) -> OwnedMutexGuard<()> {
        self.handle(account.digits()).lock_owned().await
    }

    /// Exclusive locks on two distinct accounts, acquired in a fixed global
    /// order.
    pub async fn lock_pair(
        &self,
        a: &AccountNumber,
        b: &AccountNumber,
    ) -> (OwnedMutexGuard<()>, OwnedMutexGuard<()>) {
        let (ka, kb) = (a.digits(), b.digits());
        debug_assert_ne!(ka, kb, "lock_pair requires distinct accounts");

        if ka <= kb {
            let first = self.handle(ka).lock_owned().await;
            let second = self.handle(kb).lock_owned().await;
            (first, second)
        } else {
            let second = self.handle(kb).lock_owned().await;
            let first = self.handle(ka).lock_owned().await;
            (first, second)
        }
    }
}
