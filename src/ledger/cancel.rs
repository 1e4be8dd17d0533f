//! Cancellation
//!
//! Reverses a posted transaction's balance effect and flips its status to
//! CANCELED. Transfer legs are canceled as a pair: both legs flip and both
//! balances reverse in one atomic commit. Cancellation never deletes rows
//! and never breaks the non-negative balance invariant.

use crate::domain::{
    Account, AccountNumber, Amount, Transaction, TransactionKind, TransactionStatus,
};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{CommitSet, LedgerStore, PairQuery};

use super::Ledger;

impl<S: LedgerStore> Ledger<S> {
    /// Cancel a posted transaction by reference, reversing its balance
    /// effect. Returns the requested row with its new status.
    pub async fn cancel(&self, reference_input: &str) -> LedgerResult<Transaction> {
        let transaction = self.transaction(reference_input).await?;
        if transaction.is_canceled() {
            return Err(LedgerError::AlreadyCanceled(reference_input.to_string()));
        }

        match transaction.kind {
            TransactionKind::Deposit | TransactionKind::Withdraw => {
                self.cancel_single(transaction).await
            }
            TransactionKind::TransferOut | TransactionKind::TransferIn => {
                self.cancel_transfer(transaction).await
            }
            kind => Err(LedgerError::UnsupportedCancellation(kind)),
        }
    }

    /// Reverse a deposit or withdrawal on its owning account.
    async fn cancel_single(&self, transaction: Transaction) -> LedgerResult<Transaction> {
        let number = transaction.account.clone();

        let _guard = self.locks.lock(&number).await;
        // Re-read under the lock; a concurrent cancel may have won.
        let mut transaction = self.reload(&transaction).await?;
        if transaction.is_canceled() {
            return Err(LedgerError::AlreadyCanceled(
                transaction.reference.to_string(),
            ));
        }

        let account = self
            .store()
            .account(&number)
            .await?
            .ok_or_else(|| LedgerError::AccountMissing(transaction.reference.to_string()))?;
        let amount = Amount::new(transaction.abs_amount())
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;

        let new_balance = match transaction.kind {
            // Reversing a deposit takes money back out; it must still be there.
            TransactionKind::Deposit => {
                if !account.balance.is_sufficient_for(&amount) {
                    return Err(LedgerError::InsufficientFunds {
                        required: amount.value(),
                        available: account.balance.value(),
                    });
                }
                account
                    .balance
                    .debit(&amount)
                    .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?
            }
            TransactionKind::Withdraw => account
                .balance
                .credit(&amount)
                .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?,
            kind => return Err(LedgerError::UnsupportedCancellation(kind)),
        };

        let set = CommitSet::new()
            .balance(number.clone(), account.balance.value(), new_balance.value())
            .flip(transaction.reference.clone(), TransactionStatus::Canceled);
        self.store()
            .commit(set)
            .await
            .map_err(Self::map_commit)?;

        tracing::info!(
            reference = %transaction.reference,
            kind = %transaction.kind,
            account = %number,
            "transaction canceled"
        );
        transaction.status = TransactionStatus::Canceled;
        Ok(transaction)
    }

    /// Reverse a transfer: credit the source, debit the destination, flip
    /// both legs.
    async fn cancel_transfer(&self, transaction: Transaction) -> LedgerResult<Transaction> {
        let reference = transaction.reference.to_string();
        let from_number = Self::endpoint(&transaction, transaction.from_account.as_deref())?;
        let to_number = Self::endpoint(&transaction, transaction.to_account.as_deref())?;
        if from_number.digits() == to_number.digits() {
            return Err(LedgerError::AccountMissing(reference));
        }

        let _guards = self.locks.lock_pair(&from_number, &to_number).await;
        let mut transaction = self.reload(&transaction).await?;
        if transaction.is_canceled() {
            return Err(LedgerError::AlreadyCanceled(reference));
        }

        let pair = self.locate_pair(&transaction).await?;

        let from = self.endpoint_account(&transaction, &from_number).await?;
        let to = self.endpoint_account(&transaction, &to_number).await?;
        let amount = Amount::new(transaction.abs_amount())
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;

        // Money flows back: source regains, destination gives up.
        if !to.balance.is_sufficient_for(&amount) {
            return Err(LedgerError::InsufficientFunds {
                required: amount.value(),
                available: to.balance.value(),
            });
        }
        let new_from = from
            .balance
            .credit(&amount)
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;
        let new_to = to
            .balance
            .debit(&amount)
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;

        let set = CommitSet::new()
            .balance(from.number.clone(), from.balance.value(), new_from.value())
            .balance(to.number.clone(), to.balance.value(), new_to.value())
            .flip(transaction.reference.clone(), TransactionStatus::Canceled)
            .flip(pair.reference.clone(), TransactionStatus::Canceled);
        self.store()
            .commit(set)
            .await
            .map_err(Self::map_commit)?;

        tracing::info!(
            reference = %transaction.reference,
            pair = %pair.reference,
            from = %from.number,
            to = %to.number,
            "transfer canceled"
        );
        transaction.status = TransactionStatus::Canceled;
        Ok(transaction)
    }

    /// Find the opposite leg of a transfer: by stored `pair_ref` when
    /// present, otherwise by business-key match for historical rows.
    async fn locate_pair(&self, transaction: &Transaction) -> LedgerResult<Transaction> {
        let reference = transaction.reference.to_string();

        if let Some(pair_ref) = &transaction.pair_ref {
            let pair = self
                .store()
                .transaction(pair_ref)
                .await?
                .ok_or_else(|| LedgerError::PairNotFound(reference.clone()))?;
            if pair.is_canceled() {
                return Err(LedgerError::PairAlreadyCanceled(reference));
            }
            return Ok(pair);
        }

        let counterpart = transaction
            .kind
            .counterpart()
            .ok_or_else(|| LedgerError::UnsupportedCancellation(transaction.kind))?;
        let query = PairQuery {
            kind: counterpart,
            from_account: transaction
                .from_account
                .clone()
                .ok_or_else(|| LedgerError::AccountMissing(reference.clone()))?,
            to_account: transaction
                .to_account
                .clone()
                .ok_or_else(|| LedgerError::AccountMissing(reference.clone()))?,
            abs_amount: transaction.abs_amount(),
            exclude: transaction.reference.clone(),
        };
        self.store()
            .find_transfer_pair(&query)
            .await?
            .ok_or(LedgerError::PairNotFound(reference))
    }

    async fn reload(&self, transaction: &Transaction) -> LedgerResult<Transaction> {
        self.store()
            .transaction(&transaction.reference)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction.reference.to_string()))
    }

    fn endpoint(
        transaction: &Transaction,
        endpoint: Option<&str>,
    ) -> LedgerResult<AccountNumber> {
        endpoint
            .and_then(|s| AccountNumber::parse(s).ok())
            .ok_or_else(|| LedgerError::AccountMissing(transaction.reference.to_string()))
    }

    async fn endpoint_account(
        &self,
        transaction: &Transaction,
        number: &AccountNumber,
    ) -> LedgerResult<Account> {
        self.store()
            .account(number)
            .await?
            .ok_or_else(|| LedgerError::AccountMissing(transaction.reference.to_string()))
    }
}
