//! Postgres store tests.
//!
//! Require a database with migrations/ applied; run with
//! `cargo test -- --ignored` and DATABASE_URL set.

mod common;

use chrono::Utc;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use bank_ledger::credential::hash_pin;
use bank_ledger::domain::{
    Account, AccountNumber, AccountStatus, Balance, CitizenId, Member, MemberId, Transaction,
    TransactionKind, TransactionRef, TransactionStatus,
};
use bank_ledger::store::{AccountStore, CommitSet, LedgerStore, PgStore, StoreError, TransactionStore};

async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::query("TRUNCATE TABLE transactions, accounts, members CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}

async fn seed_account(store: &PgStore, number: &str, member_id: &str) -> Account {
    let member = Member {
        id: MemberId::from(member_id),
        first_name: "Test".to_string(),
        last_name: "Member".to_string(),
        email: "test@example.com".to_string(),
        citizen_id: CitizenId::parse("1101700230708").unwrap(),
        pin_hash: hash_pin(common::PIN),
    };
    store.insert_member(&member).await.unwrap();

    let account = Account {
        number: AccountNumber::parse(number).unwrap(),
        member_id: member.id,
        balance: Balance::new(dec!(1000)).unwrap(),
        status: AccountStatus::Active,
        opened_at: Utc::now(),
    };
    store.insert_account(&account).await.unwrap();
    account
}

fn deposit_row(reference: &str, account: &AccountNumber) -> Transaction {
    Transaction {
        reference: TransactionRef::parse(reference).unwrap(),
        posted_at: Utc::now(),
        kind: TransactionKind::Deposit,
        amount: dec!(100),
        status: TransactionStatus::Success,
        from_account: None,
        to_account: Some(account.to_string()),
        account: account.clone(),
        pair_ref: None,
        actor: None,
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_commit_and_read_back() {
    let store = PgStore::new(setup_test_db().await);
    let account = seed_account(&store, common::ALICE, "pg-m1").await;

    let set = CommitSet::new()
        .balance(account.number.clone(), dec!(1000), dec!(1100))
        .insert(deposit_row("00000001PGX00001", &account.number));
    store.commit(set).await.unwrap();

    let reloaded = store.account(&account.number).await.unwrap().unwrap();
    assert_eq!(reloaded.balance.value(), dec!(1100));

    let rows = store
        .transactions_for_account(&account.number)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, TransactionKind::Deposit);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_stale_balance_write_rolls_back_whole_set() {
    let store = PgStore::new(setup_test_db().await);
    let account = seed_account(&store, common::ALICE, "pg-m1").await;

    let set = CommitSet::new()
        .balance(account.number.clone(), dec!(999), dec!(1099))
        .insert(deposit_row("00000002PGX00002", &account.number));
    assert!(matches!(store.commit(set).await, Err(StoreError::Conflict)));

    let reloaded = store.account(&account.number).await.unwrap().unwrap();
    assert_eq!(reloaded.balance.value(), dec!(1000));
    assert!(store
        .transactions_for_account(&account.number)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_cascades_history() {
    let store = PgStore::new(setup_test_db().await);
    let account = seed_account(&store, common::ALICE, "pg-m1").await;

    store
        .commit(CommitSet::new().insert(deposit_row("00000003PGX00003", &account.number)))
        .await
        .unwrap();

    assert!(store.delete_account(&account.number).await.unwrap());
    assert!(store
        .transactions_for_account(&account.number)
        .await
        .unwrap()
        .is_empty());
    assert!(!store.delete_account(&account.number).await.unwrap());
}
