//! Seed tool
//!
//! Connects to the configured database, verifies the schema, seeds a demo
//! member with an open account, and posts an initial deposit. Intended for
//! development databases only.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bank_ledger::credential::hash_pin;
use bank_ledger::domain::{CitizenId, Member, MemberId};
use bank_ledger::store::AccountStore;
use bank_ledger::{db, Config, Ledger, PgStore, Sha256Verifier, TracingSink};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bank_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    let pool = db::connect(&config).await?;
    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        anyhow::bail!("Schema check failed; apply migrations/ first");
    }

    let store = PgStore::new(pool);
    let ledger = Ledger::new(store, Arc::new(Sha256Verifier), Arc::new(TracingSink));

    let member_id = MemberId::from("demo-member");
    if ledger.store().member(&member_id).await?.is_none() {
        let member = Member {
            id: member_id.clone(),
            first_name: "Demo".to_string(),
            last_name: "Member".to_string(),
            email: "demo@example.com".to_string(),
            citizen_id: CitizenId::parse("1101700230708")?,
            pin_hash: hash_pin("123456"),
        };
        ledger.store().insert_member(&member).await?;
        tracing::info!(member = %member.id, "member seeded");
    }

    let account = ledger.open_account(&member_id, "123456").await?;
    let deposit = ledger
        .deposit(account.number.as_str(), rust_decimal::Decimal::from(1000))
        .await?;
    tracing::info!(
        account = %account.number,
        reference = %deposit.reference,
        "seed complete"
    );

    Ok(())
}
