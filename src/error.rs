//! Error handling module
//!
//! Centralized error taxonomy for ledger operations. Every failure aborts
//! the whole operation; nothing is persisted partially. The engine never
//! retries internally — callers may retry `Conflict`-kind errors from
//! scratch.

use rust_decimal::Decimal;

use crate::domain::{AccountStatus, TransactionKind};
use crate::store::StoreError;

/// Ledger-wide Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Coarse classification of a ledger failure, used by callers to choose an
/// HTTP status or user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Unauthorized,
    PreconditionFailed,
    Conflict,
    Unsupported,
    Internal,
}

/// Ledger operation errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    // Lookup failures
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Destination account not found: {0}")]
    DestinationNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Account {0} has no owning member")]
    OwnerMissing(String),

    // Credential failures
    #[error("PIN is required")]
    MissingPin,

    #[error("PIN does not match")]
    PinMismatch,

    // Input failures
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    // Precondition failures
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Account {number} is not active (status: {status})")]
    AccountNotActive {
        number: String,
        status: AccountStatus,
    },

    #[error("Destination account {number} is not active (status: {status})")]
    DestinationNotActive {
        number: String,
        status: AccountStatus,
    },

    #[error("Status transition {from} -> {to} is not allowed")]
    InvalidStatusTransition {
        from: AccountStatus,
        to: AccountStatus,
    },

    #[error("Account {number} still holds a balance of {balance}")]
    NonZeroBalance { number: String, balance: Decimal },

    // Cancellation failures
    #[error("Transaction {0} is already canceled")]
    AlreadyCanceled(String),

    #[error("No matching transfer leg found for {0}")]
    PairNotFound(String),

    #[error("Paired transfer leg of {0} is already canceled")]
    PairAlreadyCanceled(String),

    #[error("Cannot resolve account(s) referenced by transaction {0}")]
    AccountMissing(String),

    #[error("Cancellation of {0} transactions is not supported")]
    UnsupportedCancellation(TransactionKind),

    // Concurrency
    #[error("Concurrent modification detected; retry the whole operation")]
    ConcurrentModification,

    // Infrastructure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AccountNotFound(_)
            | LedgerError::DestinationNotFound(_)
            | LedgerError::TransactionNotFound(_)
            | LedgerError::MemberNotFound(_)
            | LedgerError::OwnerMissing(_)
            | LedgerError::PairNotFound(_)
            | LedgerError::AccountMissing(_) => ErrorKind::NotFound,

            LedgerError::MissingPin
            | LedgerError::InvalidAmount(_)
            | LedgerError::SameAccountTransfer => ErrorKind::InvalidInput,

            LedgerError::PinMismatch => ErrorKind::Unauthorized,

            LedgerError::InsufficientFunds { .. }
            | LedgerError::AccountNotActive { .. }
            | LedgerError::DestinationNotActive { .. }
            | LedgerError::InvalidStatusTransition { .. }
            | LedgerError::NonZeroBalance { .. }
            | LedgerError::AlreadyCanceled(_)
            | LedgerError::PairAlreadyCanceled(_) => ErrorKind::PreconditionFailed,

            LedgerError::ConcurrentModification => ErrorKind::Conflict,

            LedgerError::UnsupportedCancellation(_) => ErrorKind::Unsupported,

            LedgerError::Store(StoreError::Conflict) => ErrorKind::Conflict,
            LedgerError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Client errors are safe to surface verbatim to the end user.
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }

    /// Only conflict errors are worth retrying, always from scratch.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            LedgerError::AccountNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(LedgerError::PinMismatch.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            LedgerError::InsufficientFunds {
                required: Decimal::new(100, 0),
                available: Decimal::new(50, 0),
            }
            .kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(
            LedgerError::ConcurrentModification.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LedgerError::UnsupportedCancellation(TransactionKind::Adjustment).kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_retryable() {
        assert!(LedgerError::ConcurrentModification.is_retryable());
        assert!(!LedgerError::MissingPin.is_retryable());
        assert!(!LedgerError::AlreadyCanceled("r".into()).is_retryable());
    }
}
