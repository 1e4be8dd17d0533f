//! Read-side assembly
//!
//! Enriches transaction rows with counterparty display names and builds
//! receipts for the document pipeline. Name resolution is best-effort:
//! a deleted account or member simply yields no name.

use crate::domain::{AccountNumber, Transaction};
use crate::error::{LedgerError, LedgerResult};
use crate::notify::Receipt;
use crate::store::LedgerStore;
use crate::view::TransactionView;

use super::Ledger;

impl<S: LedgerStore> Ledger<S> {
    /// One transaction, enriched with counterparty names.
    pub async fn transaction_view(&self, reference_input: &str) -> LedgerResult<TransactionView> {
        let transaction = self.transaction(reference_input).await?;
        self.assemble_view(&transaction).await
    }

    /// Every transaction of one account, enriched, in history order.
    pub async fn transaction_views_for_account(
        &self,
        account_input: &str,
    ) -> LedgerResult<Vec<TransactionView>> {
        let rows = self.transactions_for_account(account_input).await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            views.push(self.assemble_view(row).await?);
        }
        Ok(views)
    }

    /// The full history, enriched.
    pub async fn transaction_views(&self) -> LedgerResult<Vec<TransactionView>> {
        let rows = self.transactions().await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            views.push(self.assemble_view(row).await?);
        }
        Ok(views)
    }

    /// Build the receipt for a finalized transaction: the enriched view, the
    /// owning member's email, and the account's last four digits as the
    /// document-unlock code.
    pub async fn receipt(&self, reference_input: &str) -> LedgerResult<Receipt> {
        let transaction = self.transaction(reference_input).await?;
        let view = self.assemble_view(&transaction).await?;

        let account = self
            .store()
            .account(&transaction.account)
            .await?
            .ok_or_else(|| LedgerError::AccountMissing(transaction.reference.to_string()))?;
        let member = self
            .store()
            .member(&account.member_id)
            .await?
            .ok_or_else(|| LedgerError::OwnerMissing(account.number.to_string()))?;

        Ok(Receipt {
            view,
            email: member.email.clone(),
            unlock_code: account.number.last4(),
        })
    }

    /// Build and hand off a receipt. Delivery failure is logged, never
    /// propagated; the ledger write already stands.
    pub async fn send_receipt(&self, reference_input: &str) -> LedgerResult<Receipt> {
        let receipt = self.receipt(reference_input).await?;
        if let Err(e) = self.sink.deliver(&receipt) {
            tracing::warn!(
                reference = %receipt.view.reference,
                error = %e,
                "receipt delivery failed"
            );
        }
        Ok(receipt)
    }

    async fn assemble_view(&self, transaction: &Transaction) -> LedgerResult<TransactionView> {
        let from_name = self
            .holder_name(transaction.from_account.as_deref())
            .await?;
        let to_name = self.holder_name(transaction.to_account.as_deref()).await?;
        Ok(TransactionView::assemble(transaction, from_name, to_name))
    }

    /// Display name of the member behind an account endpoint, if the account
    /// and its owner still exist.
    async fn holder_name(&self, endpoint: Option<&str>) -> LedgerResult<Option<String>> {
        let Some(number) = endpoint.and_then(|s| AccountNumber::parse(s).ok()) else {
            return Ok(None);
        };
        let Some(account) = self.store().account(&number).await? else {
            return Ok(None);
        };
        let Some(member) = self.store().member(&account.member_id).await? else {
            return Ok(None);
        };
        Ok(Some(member.display_name()))
    }
}
