//! Transaction views
//!
//! Read-side projection of a transaction row enriched with counterparty
//! display names. Deleted counterparties resolve to `None` rather than
//! failing; from/to are denormalized strings, not foreign keys.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Transaction, TransactionKind, TransactionStatus};

/// A transaction as presented to back-office callers and receipts.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub reference: String,
    pub posted_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    pub account: String,
}

impl TransactionView {
    /// Assemble from a row plus resolved counterparty names.
    pub fn assemble(
        transaction: &Transaction,
        from_name: Option<String>,
        to_name: Option<String>,
    ) -> Self {
        Self {
            reference: transaction.reference.to_string(),
            posted_at: transaction.posted_at,
            kind: transaction.kind,
            amount: transaction.amount,
            status: transaction.status,
            from_account: transaction.from_account.clone(),
            to_account: transaction.to_account.clone(),
            from_name,
            to_name,
            account: transaction.account.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountNumber, TransactionRef};
    use rust_decimal_macros::dec;

    #[test]
    fn test_assemble_keeps_denormalized_counterparties() {
        let row = Transaction {
            reference: TransactionRef::parse("00000001ABC00001").unwrap(),
            posted_at: Utc::now(),
            kind: TransactionKind::TransferOut,
            amount: dec!(-200),
            status: TransactionStatus::Success,
            from_account: Some("431-7-99003-6".to_string()),
            to_account: Some("883-1-93408-4".to_string()),
            account: AccountNumber::parse("431-7-99003-6").unwrap(),
            pair_ref: None,
            actor: None,
        };

        let view = TransactionView::assemble(&row, Some("A B".to_string()), None);
        assert_eq!(view.from_account.as_deref(), Some("431-7-99003-6"));
        assert_eq!(view.from_name.as_deref(), Some("A B"));
        assert!(view.to_name.is_none());
    }
}
