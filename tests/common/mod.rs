//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

use bank_ledger::credential::hash_pin;
use bank_ledger::domain::{
    Account, AccountNumber, AccountStatus, Balance, CitizenId, Member, MemberId,
};
use bank_ledger::notify::NullSink;
use bank_ledger::store::{AccountStore, MemoryStore};
use bank_ledger::{Ledger, Sha256Verifier};

pub const PIN: &str = "123456";

/// Seeded accounts: Alice active with 1000, Bob active with 500, Carol
/// frozen with 200.
pub const ALICE: &str = "431-7-99003-6";
pub const BOB: &str = "883-1-93408-4";
pub const CAROL: &str = "111-1-11111-9";

pub const ALICE_ID: &str = "m-alice";
pub const BOB_ID: &str = "m-bob";
pub const CAROL_ID: &str = "m-carol";

fn member(id: &str, first: &str, last: &str, citizen_id: &str) -> Member {
    Member {
        id: MemberId::from(id),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.com", first.to_lowercase()),
        citizen_id: CitizenId::parse(citizen_id).unwrap(),
        pin_hash: hash_pin(PIN),
    }
}

fn account(number: &str, member: &str, balance: Decimal, status: AccountStatus) -> Account {
    Account {
        number: AccountNumber::parse(number).unwrap(),
        member_id: MemberId::from(member),
        balance: Balance::new(balance).unwrap(),
        status,
        opened_at: Utc::now(),
    }
}

/// A ledger over a freshly seeded in-memory store with deterministic
/// identifier generation.
pub async fn fixture() -> Ledger<MemoryStore> {
    let store = MemoryStore::new();

    store
        .insert_member(&member(ALICE_ID, "Alice", "Anderson", "1101700230708"))
        .await
        .unwrap();
    store
        .insert_member(&member(BOB_ID, "Bob", "Brown", "1234567890121"))
        .await
        .unwrap();
    store
        .insert_member(&member(CAROL_ID, "Carol", "Clark", "3310101234564"))
        .await
        .unwrap();

    store
        .insert_account(&account(
            ALICE,
            ALICE_ID,
            Decimal::from(1000),
            AccountStatus::Active,
        ))
        .await
        .unwrap();
    store
        .insert_account(&account(
            BOB,
            BOB_ID,
            Decimal::from(500),
            AccountStatus::Active,
        ))
        .await
        .unwrap();
    store
        .insert_account(&account(
            CAROL,
            CAROL_ID,
            Decimal::from(200),
            AccountStatus::Frozen,
        ))
        .await
        .unwrap();

    Ledger::with_rng(
        store,
        Arc::new(Sha256Verifier),
        Arc::new(NullSink),
        StdRng::seed_from_u64(42),
    )
}

pub async fn balance_of(ledger: &Ledger<MemoryStore>, number: &str) -> Decimal {
    ledger.account(number).await.unwrap().balance.value()
}
