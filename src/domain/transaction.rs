//! Transaction model
//!
//! A transaction is one row of double-entry history. Rows are immutable
//! except for the one-way SUCCESS -> CANCELED status transition; a transfer
//! always produces two rows (one leg per account) cross-linked by `pair_ref`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::account::AccountNumber;

/// A 16-character transaction reference: 8 digits, 3 uppercase ASCII
/// letters, 5 digits, no separators.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionRef(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid transaction reference: {0}")]
pub struct TransactionRefError(pub String);

impl TransactionRef {
    pub fn parse(input: &str) -> Result<Self, TransactionRefError> {
        let bytes = input.as_bytes();
        let ok = bytes.len() == 16
            && bytes[..8].iter().all(|b| b.is_ascii_digit())
            && bytes[8..11].iter().all(|b| b.is_ascii_uppercase())
            && bytes[11..].iter().all(|b| b.is_ascii_digit());
        if !ok {
            return Err(TransactionRefError(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    /// Build from already-validated parts. Used by the identifier generator.
    pub(crate) fn from_parts(digits8: &str, letters3: &str, digits5: &str) -> Self {
        debug_assert!(digits8.len() == 8 && letters3.len() == 3 && digits5.len() == 5);
        Self(format!("{}{}{}", digits8, letters3, digits5))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TransactionRef {
    type Err = TransactionRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TransactionRef {
    type Error = TransactionRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TransactionRef> for String {
    fn from(reference: TransactionRef) -> Self {
        reference.0
    }
}

/// Transaction kind.
///
/// `Adjustment` is the generic administrative path: inserted verbatim by
/// back-office tooling, never balance-affecting, never cancelable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
    Adjustment,
}

impl TransactionKind {
    /// The opposite leg of a transfer, if this kind is a transfer leg.
    pub fn counterpart(self) -> Option<TransactionKind> {
        match self {
            TransactionKind::TransferOut => Some(TransactionKind::TransferIn),
            TransactionKind::TransferIn => Some(TransactionKind::TransferOut),
            _ => None,
        }
    }

    pub fn is_transfer_leg(self) -> bool {
        self.counterpart().is_some()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "deposit"),
            TransactionKind::Withdraw => write!(f, "withdraw"),
            TransactionKind::TransferOut => write!(f, "transfer_out"),
            TransactionKind::TransferIn => write!(f, "transfer_in"),
            TransactionKind::Adjustment => write!(f, "adjustment"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            "transfer_out" => Ok(TransactionKind::TransferOut),
            "transfer_in" => Ok(TransactionKind::TransferIn),
            "adjustment" => Ok(TransactionKind::Adjustment),
            other => Err(format!("Invalid transaction kind: {}", other)),
        }
    }
}

/// Transaction status. SUCCESS -> CANCELED is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Canceled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => write!(f, "success"),
            TransactionStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(TransactionStatus::Success),
            "canceled" => Ok(TransactionStatus::Canceled),
            other => Err(format!("Invalid transaction status: {}", other)),
        }
    }
}

/// One row of ledger history.
///
/// `amount` is signed from the owning account's point of view: positive for
/// inbound money, negative for outbound. `from_account`/`to_account` are
/// denormalized strings, not foreign keys, so a counterparty that was later
/// deleted stays readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub reference: TransactionRef,
    pub posted_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    /// The account whose balance this row debits/credits.
    pub account: AccountNumber,
    /// The opposite transfer leg, stored at creation time so cancellation
    /// never has to rediscover the pairing by business-key match.
    pub pair_ref: Option<TransactionRef>,
    /// Administrative actor, when the row was inserted by back-office tooling.
    pub actor: Option<Uuid>,
}

impl Transaction {
    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    pub fn is_canceled(&self) -> bool {
        self.status == TransactionStatus::Canceled
    }
}
