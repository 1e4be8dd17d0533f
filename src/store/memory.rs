//! In-memory store
//!
//! Backs the engine in tests and lightweight embeddings. Accounts are keyed
//! by canonical digits; transactions keep insertion order, which doubles as
//! chronological order for listings and pair tie-breaks.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{
    Account, AccountNumber, Member, MemberId, Transaction, TransactionRef,
    TransactionStatus,
};

use super::{AccountStore, CommitSet, LedgerStore, PairQuery, StoreError, TransactionStore};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    members: HashMap<String, Member>,
    transactions: Vec<Transaction>,
}

/// Thread-safe in-memory implementation of the store seams.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryStore {
    async fn account(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.accounts.get(&number.digits()).cloned())
    }

    async fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(accounts)
    }

    async fn accounts_for_member(&self, member: &MemberId) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| &a.member_id == member)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(accounts)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let key = account.number.digits();
        if inner.accounts.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        inner.accounts.insert(key, account.clone());
        Ok(())
    }

    async fn delete_account(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let key = number.digits();
        if inner.accounts.remove(&key).is_none() {
            return Ok(false);
        }
        // Cascade: drop the account's transaction history.
        inner.transactions.retain(|t| t.account != *number);
        Ok(true)
    }

    async fn member(&self, id: &MemberId) -> Result<Option<Member>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.members.get(id.as_str()).cloned())
    }

    async fn insert_member(&self, member: &Member) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.members.contains_key(member.id.as_str()) {
            return Err(StoreError::Conflict);
        }
        inner.members.insert(member.id.as_str().to_string(), member.clone());
        Ok(())
    }

    async fn update_member(&self, member: &Member) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let slot = inner
            .members
            .get_mut(member.id.as_str())
            .ok_or_else(|| StoreError::MissingRow(member.id.to_string()))?;
        *slot = member.clone();
        Ok(())
    }
}

impl TransactionStore for MemoryStore {
    async fn transaction(
        &self,
        reference: &TransactionRef,
    ) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .transactions
            .iter()
            .find(|t| t.reference == *reference)
            .cloned())
    }

    async fn transactions_for_account(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.account == *number)
            .cloned()
            .collect())
    }

    async fn transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.transactions.clone())
    }

    async fn find_transfer_pair(
        &self,
        query: &PairQuery,
    ) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut candidates: Vec<&Transaction> = inner
            .transactions
            .iter()
            .filter(|t| {
                t.kind == query.kind
                    && t.status != TransactionStatus::Canceled
                    && t.reference != query.exclude
                    && t.from_account.as_deref() == Some(query.from_account.as_str())
                    && t.to_account.as_deref() == Some(query.to_account.as_str())
                    && t.abs_amount() == query.abs_amount
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.posted_at
                .cmp(&b.posted_at)
                .then_with(|| a.reference.cmp(&b.reference))
        });
        Ok(candidates.first().map(|t| (*t).clone()))
    }
}

impl LedgerStore for MemoryStore {
    async fn commit(&self, set: CommitSet) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");

        // Validate the whole set first so a failure applies nothing.
        for write in &set.balances {
            let account = inner
                .accounts
                .get(&write.account.digits())
                .ok_or_else(|| StoreError::MissingRow(write.account.to_string()))?;
            if account.balance.value() != write.expected {
                return Err(StoreError::Conflict);
            }
        }
        for (number, _) in &set.account_status {
            if !inner.accounts.contains_key(&number.digits()) {
                return Err(StoreError::MissingRow(number.to_string()));
            }
        }
        for transaction in &set.inserts {
            if inner
                .transactions
                .iter()
                .any(|t| t.reference == transaction.reference)
            {
                return Err(StoreError::Conflict);
            }
        }
        for (reference, _) in &set.tx_status {
            if !inner.transactions.iter().any(|t| t.reference == *reference) {
                return Err(StoreError::MissingRow(reference.to_string()));
            }
        }

        for write in &set.balances {
            let account = inner
                .accounts
                .get_mut(&write.account.digits())
                .expect("validated above");
            account.balance =
                crate::domain::Balance::new(write.new).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        }
        for (number, status) in set.account_status {
            let account = inner
                .accounts
                .get_mut(&number.digits())
                .expect("validated above");
            account.status = status;
        }
        for transaction in set.inserts {
            inner.transactions.push(transaction);
        }
        for (reference, status) in set.tx_status {
            let transaction = inner
                .transactions
                .iter_mut()
                .find(|t| t.reference == reference)
                .expect("validated above");
            transaction.status = status;
        }

        Ok(())
    }
}
