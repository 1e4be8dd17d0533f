//! bank-ledger Library
//!
//! Back-office ledger transaction engine: accounts, double-entry history,
//! PIN-gated withdrawals and transfers, and full-reversal cancellation.

pub mod credential;
pub mod domain;
pub mod error;
pub mod ident;
pub mod ledger;
pub mod notify;
pub mod store;
pub mod view;

// Binary plumbing
pub mod config;
pub mod db;

pub use config::Config;
pub use credential::{CredentialVerifier, Sha256Verifier};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use ledger::{CreateRaw, Ledger};
pub use notify::{NullSink, Receipt, ReceiptSink, TracingSink};
pub use store::{LedgerStore, MemoryStore, PgStore};
pub use view::TransactionView;
pub use domain::{
    Account, AccountNumber, AccountStatus, Amount, Balance, Member, MemberId, Transaction,
    TransactionKind, TransactionRef, TransactionStatus,
};
