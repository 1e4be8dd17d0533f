//! Postgres store
//!
//! sqlx-backed implementation of the store seams. Balance writes are
//! compare-and-update (`WHERE balance = expected`) inside one database
//! transaction, so a lost race surfaces as [`StoreError::Conflict`] and the
//! whole commit set rolls back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Account, AccountNumber, Balance, CitizenId, Member, MemberId, Transaction, TransactionRef,
};

use super::{AccountStore, CommitSet, LedgerStore, PairQuery, StoreError, TransactionStore};

type AccountRow = (String, String, Decimal, String, DateTime<Utc>);
type MemberRow = (String, String, String, String, String, String);
type TransactionRow = (
    String,
    DateTime<Utc>,
    String,
    Decimal,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<Uuid>,
);

const ACCOUNT_COLUMNS: &str = "account_number, member_id, balance, status, opened_at";
const TRANSACTION_COLUMNS: &str =
    "reference, posted_at, kind, amount, status, from_account, to_account, account_number, pair_ref, actor";

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{}: {}", what, detail))
}

fn account_from_row(row: AccountRow) -> Result<Account, StoreError> {
    let (number, member_id, balance, status, opened_at) = row;
    Ok(Account {
        number: AccountNumber::parse(&number).map_err(|e| corrupt("account_number", e))?,
        member_id: MemberId(member_id),
        balance: Balance::new(balance).map_err(|e| corrupt("balance", e))?,
        status: status.parse().map_err(|e| corrupt("status", e))?,
        opened_at,
    })
}

fn member_from_row(row: MemberRow) -> Result<Member, StoreError> {
    let (id, first_name, last_name, email, citizen_id, pin_hash) = row;
    Ok(Member {
        id: MemberId(id),
        first_name,
        last_name,
        email,
        citizen_id: CitizenId::parse(&citizen_id).map_err(|e| corrupt("citizen_id", e))?,
        pin_hash,
    })
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction, StoreError> {
    let (reference, posted_at, kind, amount, status, from_account, to_account, account, pair_ref, actor) =
        row;
    Ok(Transaction {
        reference: TransactionRef::parse(&reference).map_err(|e| corrupt("reference", e))?,
        posted_at,
        kind: kind.parse().map_err(|e| corrupt("kind", e))?,
        amount,
        status: status.parse().map_err(|e| corrupt("tx status", e))?,
        from_account,
        to_account,
        account: AccountNumber::parse(&account).map_err(|e| corrupt("account_number", e))?,
        pair_ref: pair_ref
            .map(|r| TransactionRef::parse(&r).map_err(|e| corrupt("pair_ref", e)))
            .transpose()?,
        actor,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AccountStore for PgStore {
    async fn account(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE account_number = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts ORDER BY account_number",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    async fn accounts_for_member(&self, member: &MemberId) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE member_id = $1 ORDER BY account_number",
            ACCOUNT_COLUMNS
        ))
        .bind(member.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (account_number, member_id, balance, status, opened_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(account.number.as_str())
        .bind(account.member_id.as_str())
        .bind(account.balance.value())
        .bind(account.status.to_string())
        .bind(account.opened_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_account(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        // transactions.account_number is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM accounts WHERE account_number = $1")
            .bind(number.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn member(&self, id: &MemberId) -> Result<Option<Member>, StoreError> {
        let row: Option<MemberRow> = sqlx::query_as(
            r#"
            SELECT member_id, first_name, last_name, email, citizen_id, pin_hash
            FROM members WHERE member_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(member_from_row).transpose()
    }

    async fn insert_member(&self, member: &Member) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO members (member_id, first_name, last_name, email, citizen_id, pin_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(member.id.as_str())
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(member.citizen_id.as_str())
        .bind(&member.pin_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_member(&self, member: &Member) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET first_name = $1, last_name = $2, email = $3
            WHERE member_id = $4
            "#,
        )
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(member.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow(member.id.to_string()));
        }
        Ok(())
    }
}

impl TransactionStore for PgStore {
    async fn transaction(
        &self,
        reference: &TransactionRef,
    ) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE reference = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(transaction_from_row).transpose()
    }

    async fn transactions_for_account(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE account_number = $1 ORDER BY posted_at, reference",
            TRANSACTION_COLUMNS
        ))
        .bind(number.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions ORDER BY posted_at, reference",
            TRANSACTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn find_transfer_pair(
        &self,
        query: &PairQuery,
    ) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE kind = $1
              AND status <> 'canceled'
              AND from_account = $2
              AND to_account = $3
              AND ABS(amount) = $4
              AND reference <> $5
            ORDER BY posted_at, reference
            LIMIT 1
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(query.kind.to_string())
        .bind(&query.from_account)
        .bind(&query.to_account)
        .bind(query.abs_amount)
        .bind(query.exclude.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(transaction_from_row).transpose()
    }
}

impl LedgerStore for PgStore {
    async fn commit(&self, set: CommitSet) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for write in &set.balances {
            let result = sqlx::query(
                r#"
                UPDATE accounts SET balance = $1
                WHERE account_number = $2 AND balance = $3
                "#,
            )
            .bind(write.new)
            .bind(write.account.as_str())
            .bind(write.expected)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Either the row vanished or someone moved the balance first;
                // the caller retries from scratch either way.
                return Err(StoreError::Conflict);
            }
        }

        for (number, status) in &set.account_status {
            let result = sqlx::query("UPDATE accounts SET status = $1 WHERE account_number = $2")
                .bind(status.to_string())
                .bind(number.as_str())
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::MissingRow(number.to_string()));
            }
        }

        for t in &set.inserts {
            let result = sqlx::query(
                r#"
                INSERT INTO transactions (
                    reference, posted_at, kind, amount, status,
                    from_account, to_account, account_number, pair_ref, actor
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(t.reference.as_str())
            .bind(t.posted_at)
            .bind(t.kind.to_string())
            .bind(t.amount)
            .bind(t.status.to_string())
            .bind(t.from_account.as_deref())
            .bind(t.to_account.as_deref())
            .bind(t.account.as_str())
            .bind(t.pair_ref.as_ref().map(|r| r.as_str()))
            .bind(t.actor)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Err(StoreError::Conflict),
                Err(e) => return Err(e.into()),
            }
        }

        for (reference, status) in &set.tx_status {
            let result = sqlx::query("UPDATE transactions SET status = $1 WHERE reference = $2")
                .bind(status.to_string())
                .bind(reference.as_str())
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::MissingRow(reference.to_string()));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
