//! Store seams
//!
//! The engine is pure business logic over two durable stores. These traits
//! abstract the physical storage so the same engine runs against Postgres in
//! production and an in-memory store in tests. Writes that must be atomic go
//! through a single [`CommitSet`]; the store either applies the whole set or
//! none of it, and reports a failed compare-and-update as
//! [`StoreError::Conflict`].

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use rust_decimal::Decimal;

use crate::domain::{
    Account, AccountNumber, AccountStatus, Member, MemberId, Transaction, TransactionKind,
    TransactionRef, TransactionStatus,
};

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A compare-and-update failed or a unique key was violated.
    #[error("Store conflict: concurrent modification or duplicate key")]
    Conflict,

    /// A referenced row was missing when a write was applied.
    #[error("Missing row: {0}")]
    MissingRow(String),

    /// A persisted value failed to parse back into a domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One guarded balance write: applies only if the stored balance still
/// equals `expected`.
#[derive(Debug, Clone)]
pub struct BalanceWrite {
    pub account: AccountNumber,
    pub expected: Decimal,
    pub new: Decimal,
}

/// An all-or-nothing unit of ledger writes.
///
/// A transfer is two balance writes plus two inserts; a transfer
/// cancellation is two balance writes plus two status flips. A crash or
/// conflict between them would corrupt the ledger, so the store commits the
/// set as one transaction.
#[derive(Debug, Default)]
pub struct CommitSet {
    pub balances: Vec<BalanceWrite>,
    pub account_status: Vec<(AccountNumber, AccountStatus)>,
    pub inserts: Vec<Transaction>,
    pub tx_status: Vec<(TransactionRef, TransactionStatus)>,
}

impl CommitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(mut self, account: AccountNumber, expected: Decimal, new: Decimal) -> Self {
        self.balances.push(BalanceWrite {
            account,
            expected,
            new,
        });
        self
    }

    pub fn status(mut self, account: AccountNumber, status: AccountStatus) -> Self {
        self.account_status.push((account, status));
        self
    }

    pub fn insert(mut self, transaction: Transaction) -> Self {
        self.inserts.push(transaction);
        self
    }

    pub fn flip(mut self, reference: TransactionRef, status: TransactionStatus) -> Self {
        self.tx_status.push((reference, status));
        self
    }
}

/// Business-key criteria for locating the opposite leg of a transfer.
/// Only consulted for historical rows that predate explicit pair links.
#[derive(Debug, Clone)]
pub struct PairQuery {
    pub kind: TransactionKind,
    pub from_account: String,
    pub to_account: String,
    pub abs_amount: Decimal,
    /// The leg being canceled, excluded from candidates.
    pub exclude: TransactionRef,
}

/// Durable key -> record mapping for accounts and their owners.
#[allow(async_fn_in_trait)]
pub trait AccountStore: Send + Sync {
    async fn account(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError>;

    async fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn accounts_for_member(&self, member: &MemberId) -> Result<Vec<Account>, StoreError>;

    /// Insert a new account; `Conflict` if the number is taken.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Delete an account and cascade its transaction history. Returns false
    /// if the account did not exist.
    async fn delete_account(&self, number: &AccountNumber) -> Result<bool, StoreError>;

    async fn member(&self, id: &MemberId) -> Result<Option<Member>, StoreError>;

    async fn insert_member(&self, member: &Member) -> Result<(), StoreError>;

    /// Overwrite an existing member record.
    async fn update_member(&self, member: &Member) -> Result<(), StoreError>;
}

/// Durable, append-biased mapping from transaction reference to record.
#[allow(async_fn_in_trait)]
pub trait TransactionStore: Send + Sync {
    async fn transaction(&self, reference: &TransactionRef)
        -> Result<Option<Transaction>, StoreError>;

    async fn transactions_for_account(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Oldest non-canceled transaction matching the pair criteria, earliest
    /// `posted_at` first, reference order as tie-break.
    async fn find_transfer_pair(&self, query: &PairQuery)
        -> Result<Option<Transaction>, StoreError>;
}

/// The combined seam the ledger engine runs against.
#[allow(async_fn_in_trait)]
pub trait LedgerStore: AccountStore + TransactionStore {
    /// Apply a [`CommitSet`] atomically.
    async fn commit(&self, set: CommitSet) -> Result<(), StoreError>;
}
