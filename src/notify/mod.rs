//! Receipt hand-off
//!
//! After a transaction finalizes, the ledger can hand a receipt to an
//! external document/notification pipeline (PDF rendering, email). The
//! ledger only triggers delivery; financial correctness never depends on
//! the sink's result.

use serde::Serialize;

use crate::view::TransactionView;

/// Everything the document pipeline needs: the finalized transaction view,
/// the owner's email, and the account's last four digits used as the
/// document-unlock secret.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub view: TransactionView,
    pub email: String,
    pub unlock_code: String,
}

#[derive(Debug, thiserror::Error)]
#[error("Receipt delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery seam for finalized-transaction receipts.
pub trait ReceiptSink: Send + Sync {
    fn deliver(&self, receipt: &Receipt) -> Result<(), NotifyError>;
}

/// Logs the hand-off; stands in for the real PDF/email pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReceiptSink for TracingSink {
    fn deliver(&self, receipt: &Receipt) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(receipt).map_err(|e| NotifyError(e.to_string()))?;
        tracing::info!(
            reference = %receipt.view.reference,
            email = %receipt.email,
            payload,
            "receipt handed off"
        );
        Ok(())
    }
}

/// Discards receipts. Useful in tests and batch tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReceiptSink for NullSink {
    fn deliver(&self, _receipt: &Receipt) -> Result<(), NotifyError> {
        Ok(())
    }
}
