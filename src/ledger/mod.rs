//! Ledger engine
//!
//! The only writer of balances and transaction statuses. Each operation
//! validates its preconditions in a fixed order, computes the new balances
//! and rows, and hands the store one atomic [`CommitSet`]. Failures abort
//! the whole operation; a failed commit surfaces as
//! [`LedgerError::ConcurrentModification`] and the caller may retry from
//! scratch.

mod cancel;
pub mod locks;
mod views;

use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::credential::CredentialVerifier;
use crate::domain::{
    Account, AccountNumber, AccountStatus, Amount, Member, MemberId, MemberPatch, Transaction,
    TransactionKind, TransactionRef, TransactionStatus,
};
use crate::error::{LedgerError, LedgerResult};
use crate::ident;
use crate::notify::ReceiptSink;
use crate::store::{CommitSet, LedgerStore, StoreError};

use locks::AccountLocks;

/// Attempts at generating a fresh account number before giving up on
/// store-side uniqueness conflicts.
const OPEN_ACCOUNT_RETRIES: u32 = 3;

/// Administrative direct-insert input. Persisted verbatim apart from the
/// generated reference and timestamp; never touches balances.
#[derive(Debug, Clone)]
pub struct CreateRaw {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    /// Owning account; must exist.
    pub account: String,
    pub actor: Option<Uuid>,
}

/// The ledger transaction engine.
pub struct Ledger<S> {
    store: S,
    verifier: Arc<dyn CredentialVerifier>,
    sink: Arc<dyn ReceiptSink>,
    rng: StdMutex<StdRng>,
    locks: AccountLocks,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(
        store: S,
        verifier: Arc<dyn CredentialVerifier>,
        sink: Arc<dyn ReceiptSink>,
    ) -> Self {
        Self::with_rng(store, verifier, sink, StdRng::from_entropy())
    }

    /// Construct with a seeded generator; tests use this for deterministic
    /// identifiers.
    pub fn with_rng(
        store: S,
        verifier: Arc<dyn CredentialVerifier>,
        sink: Arc<dyn ReceiptSink>,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            verifier,
            sink,
            rng: StdMutex::new(rng),
            locks: AccountLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn next_account_number(&self) -> AccountNumber {
        let mut rng = self.rng.lock().expect("rng poisoned");
        ident::account_number(&mut *rng)
    }

    fn next_reference(&self) -> TransactionRef {
        let mut rng = self.rng.lock().expect("rng poisoned");
        ident::transaction_ref(&mut *rng)
    }

    // =========================================================================
    // Shared validation helpers
    // =========================================================================

    fn parse_number(input: &str) -> LedgerResult<AccountNumber> {
        AccountNumber::parse(input).map_err(|_| LedgerError::AccountNotFound(input.to_string()))
    }

    async fn load_account(&self, number: &AccountNumber) -> LedgerResult<Account> {
        self.store
            .account(number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(number.to_string()))
    }

    fn ensure_active(account: &Account) -> LedgerResult<()> {
        if !account.is_active() {
            return Err(LedgerError::AccountNotActive {
                number: account.number.to_string(),
                status: account.status,
            });
        }
        Ok(())
    }

    fn valid_amount(amount: Decimal) -> LedgerResult<Amount> {
        Amount::new(amount).map_err(|e| LedgerError::InvalidAmount(e.to_string()))
    }

    /// Owner lookup + PIN gate shared by withdraw and transfer.
    async fn verify_owner_pin(&self, account: &Account, pin: &str) -> LedgerResult<Member> {
        let member = self
            .store
            .member(&account.member_id)
            .await?
            .ok_or_else(|| LedgerError::OwnerMissing(account.number.to_string()))?;

        if pin.trim().is_empty() {
            return Err(LedgerError::MissingPin);
        }
        if !self.verifier.verify(pin, &member.pin_hash) {
            return Err(LedgerError::PinMismatch);
        }
        Ok(member)
    }

    fn map_commit(err: StoreError) -> LedgerError {
        match err {
            StoreError::Conflict => LedgerError::ConcurrentModification,
            other => LedgerError::Store(other),
        }
    }

    // =========================================================================
    // Balance-mutation operations
    // =========================================================================

    /// Credit `amount` to an active account and record one DEPOSIT row.
    pub async fn deposit(&self, account_input: &str, amount: Decimal) -> LedgerResult<Transaction> {
        let amount = Self::valid_amount(amount)?;
        let number = Self::parse_number(account_input)?;

        let _guard = self.locks.lock(&number).await;
        let account = self.load_account(&number).await?;
        Self::ensure_active(&account)?;

        let new_balance = account
            .balance
            .credit(&amount)
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;

        let transaction = Transaction {
            reference: self.next_reference(),
            posted_at: Utc::now(),
            kind: TransactionKind::Deposit,
            amount: amount.value(),
            status: TransactionStatus::Success,
            from_account: None,
            to_account: Some(account.number.to_string()),
            account: account.number.clone(),
            pair_ref: None,
            actor: None,
        };

        let set = CommitSet::new()
            .balance(
                account.number.clone(),
                account.balance.value(),
                new_balance.value(),
            )
            .insert(transaction.clone());
        self.store.commit(set).await.map_err(Self::map_commit)?;

        tracing::info!(
            account = %account.number,
            amount = %amount,
            reference = %transaction.reference,
            "deposit posted"
        );
        Ok(transaction)
    }

    /// Debit `amount` from an active, PIN-verified account and record one
    /// WITHDRAW row (negative amount).
    pub async fn withdraw(
        &self,
        account_input: &str,
        pin: &str,
        amount: Decimal,
    ) -> LedgerResult<Transaction> {
        let number = Self::parse_number(account_input)?;

        let _guard = self.locks.lock(&number).await;
        let account = self.load_account(&number).await?;
        Self::ensure_active(&account)?;
        self.verify_owner_pin(&account, pin).await?;

        let amount = Self::valid_amount(amount)?;
        if !account.balance.is_sufficient_for(&amount) {
            return Err(LedgerError::InsufficientFunds {
                required: amount.value(),
                available: account.balance.value(),
            });
        }
        let new_balance = account
            .balance
            .debit(&amount)
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;

        let transaction = Transaction {
            reference: self.next_reference(),
            posted_at: Utc::now(),
            kind: TransactionKind::Withdraw,
            amount: -amount.value(),
            status: TransactionStatus::Success,
            from_account: Some(account.number.to_string()),
            to_account: None,
            account: account.number.clone(),
            pair_ref: None,
            actor: None,
        };

        let set = CommitSet::new()
            .balance(
                account.number.clone(),
                account.balance.value(),
                new_balance.value(),
            )
            .insert(transaction.clone());
        self.store.commit(set).await.map_err(Self::map_commit)?;

        tracing::info!(
            account = %account.number,
            amount = %amount,
            reference = %transaction.reference,
            "withdrawal posted"
        );
        Ok(transaction)
    }

    /// Move `amount` between two active accounts. Writes both legs and both
    /// balances as one atomic unit; returns the outbound leg.
    pub async fn transfer(
        &self,
        from_input: &str,
        to_input: &str,
        pin: &str,
        amount: Decimal,
    ) -> LedgerResult<Transaction> {
        let from_number = Self::parse_number(from_input)?;
        let to_number = AccountNumber::parse(to_input)
            .map_err(|_| LedgerError::DestinationNotFound(to_input.to_string()))?;
        if from_number.digits() == to_number.digits() {
            return Err(LedgerError::SameAccountTransfer);
        }

        let _guards = self.locks.lock_pair(&from_number, &to_number).await;

        let from = self.load_account(&from_number).await?;
        Self::ensure_active(&from)?;
        self.verify_owner_pin(&from, pin).await?;

        let to = self
            .store
            .account(&to_number)
            .await?
            .ok_or_else(|| LedgerError::DestinationNotFound(to_input.to_string()))?;
        if !to.is_active() {
            return Err(LedgerError::DestinationNotActive {
                number: to.number.to_string(),
                status: to.status,
            });
        }

        let amount = Self::valid_amount(amount)?;
        if !from.balance.is_sufficient_for(&amount) {
            return Err(LedgerError::InsufficientFunds {
                required: amount.value(),
                available: from.balance.value(),
            });
        }

        let new_from = from
            .balance
            .debit(&amount)
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;
        let new_to = to
            .balance
            .credit(&amount)
            .map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;

        // Both legs share one timestamp and cross-link each other.
        let posted_at = Utc::now();
        let out_ref = self.next_reference();
        let in_ref = self.next_reference();

        let out_leg = Transaction {
            reference: out_ref.clone(),
            posted_at,
            kind: TransactionKind::TransferOut,
            amount: -amount.value(),
            status: TransactionStatus::Success,
            from_account: Some(from.number.to_string()),
            to_account: Some(to.number.to_string()),
            account: from.number.clone(),
            pair_ref: Some(in_ref.clone()),
            actor: None,
        };
        let in_leg = Transaction {
            reference: in_ref,
            posted_at,
            kind: TransactionKind::TransferIn,
            amount: amount.value(),
            status: TransactionStatus::Success,
            from_account: Some(from.number.to_string()),
            to_account: Some(to.number.to_string()),
            account: to.number.clone(),
            pair_ref: Some(out_ref),
            actor: None,
        };

        let set = CommitSet::new()
            .balance(from.number.clone(), from.balance.value(), new_from.value())
            .balance(to.number.clone(), to.balance.value(), new_to.value())
            .insert(out_leg.clone())
            .insert(in_leg);
        self.store.commit(set).await.map_err(Self::map_commit)?;

        tracing::info!(
            from = %from.number,
            to = %to.number,
            amount = %amount,
            reference = %out_leg.reference,
            "transfer posted"
        );
        Ok(out_leg)
    }

    // =========================================================================
    // Administrative operations
    // =========================================================================

    /// Direct insert for back-office tooling. Stamps reference and timestamp,
    /// requires the owning account to exist, never mutates balances.
    pub async fn create_raw(&self, input: CreateRaw) -> LedgerResult<Transaction> {
        let number = Self::parse_number(&input.account)?;
        let account = self.load_account(&number).await?;

        let transaction = Transaction {
            reference: self.next_reference(),
            posted_at: Utc::now(),
            kind: input.kind,
            amount: input.amount,
            status: input.status,
            from_account: input.from_account,
            to_account: input.to_account,
            account: account.number,
            pair_ref: None,
            actor: input.actor,
        };

        self.store
            .commit(CommitSet::new().insert(transaction.clone()))
            .await
            .map_err(Self::map_commit)?;
        Ok(transaction)
    }

    /// Administrative status change, gated by the transition rules of
    /// [`AccountStatus`].
    pub async fn update_account_status(
        &self,
        account_input: &str,
        status: AccountStatus,
    ) -> LedgerResult<Account> {
        let number = Self::parse_number(account_input)?;

        let _guard = self.locks.lock(&number).await;
        let mut account = self.load_account(&number).await?;

        if !account.status.can_transition_to(status) {
            return Err(LedgerError::InvalidStatusTransition {
                from: account.status,
                to: status,
            });
        }

        self.store
            .commit(CommitSet::new().status(account.number.clone(), status))
            .await
            .map_err(Self::map_commit)?;

        tracing::info!(account = %account.number, from = %account.status, to = %status, "status changed");
        account.status = status;
        Ok(account)
    }

    /// Partial member-profile update; absent patch fields stay untouched.
    pub async fn update_member(
        &self,
        member_id: &MemberId,
        patch: MemberPatch,
    ) -> LedgerResult<Member> {
        let mut member = self
            .store
            .member(member_id)
            .await?
            .ok_or_else(|| LedgerError::MemberNotFound(member_id.to_string()))?;
        patch.apply(&mut member);
        self.store.update_member(&member).await?;
        Ok(member)
    }

    /// Open a PIN-verified account for a member: zero balance, active.
    /// Retries on a store-rejected number collision.
    pub async fn open_account(&self, member_id: &MemberId, pin: &str) -> LedgerResult<Account> {
        let member = self
            .store
            .member(member_id)
            .await?
            .ok_or_else(|| LedgerError::MemberNotFound(member_id.to_string()))?;

        if pin.trim().is_empty() {
            return Err(LedgerError::MissingPin);
        }
        if !self.verifier.verify(pin, &member.pin_hash) {
            return Err(LedgerError::PinMismatch);
        }

        for attempt in 0..OPEN_ACCOUNT_RETRIES {
            let account = Account::open(self.next_account_number(), member.id.clone(), Utc::now());
            match self.store.insert_account(&account).await {
                Ok(()) => {
                    tracing::info!(account = %account.number, member = %member.id, "account opened");
                    return Ok(account);
                }
                Err(StoreError::Conflict) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        "account number collision, regenerating"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::ConcurrentModification)
    }

    /// Delete an account and its history. Only allowed at exactly zero
    /// balance.
    pub async fn delete_account(&self, account_input: &str) -> LedgerResult<()> {
        let number = Self::parse_number(account_input)?;

        let _guard = self.locks.lock(&number).await;
        let account = self.load_account(&number).await?;

        if !account.balance.is_zero() {
            return Err(LedgerError::NonZeroBalance {
                number: account.number.to_string(),
                balance: account.balance.value(),
            });
        }

        if !self.store.delete_account(&account.number).await? {
            return Err(LedgerError::AccountNotFound(account.number.to_string()));
        }
        tracing::info!(account = %account.number, "account deleted");
        Ok(())
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub async fn account(&self, account_input: &str) -> LedgerResult<Account> {
        let number = Self::parse_number(account_input)?;
        self.load_account(&number).await
    }

    pub async fn accounts(&self) -> LedgerResult<Vec<Account>> {
        Ok(self.store.accounts().await?)
    }

    pub async fn accounts_for_member(&self, member_id: &MemberId) -> LedgerResult<Vec<Account>> {
        Ok(self.store.accounts_for_member(member_id).await?)
    }

    pub async fn transaction(&self, reference_input: &str) -> LedgerResult<Transaction> {
        let reference = TransactionRef::parse(reference_input)
            .map_err(|_| LedgerError::TransactionNotFound(reference_input.to_string()))?;
        self.store
            .transaction(&reference)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(reference_input.to_string()))
    }

    pub async fn transactions_for_account(
        &self,
        account_input: &str,
    ) -> LedgerResult<Vec<Transaction>> {
        let number = Self::parse_number(account_input)?;
        Ok(self.store.transactions_for_account(&number).await?)
    }

    pub async fn transactions(&self) -> LedgerResult<Vec<Transaction>> {
        Ok(self.store.transactions().await?)
    }
}
