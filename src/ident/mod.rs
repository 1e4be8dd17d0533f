//! Identifier generation
//!
//! Account numbers and transaction references are random, generated from an
//! injected `Rng` so tests can seed them deterministically. Uniqueness is not
//! checked here; the store's primary-key constraint is the actual guarantee
//! and the engine retries on an insert conflict.

use rand::Rng;

use crate::domain::{AccountNumber, TransactionRef};

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate an account number: three zero-padded random groups (3, 1 and 5
/// digits) plus a trailing checksum digit.
pub fn account_number<R: Rng + ?Sized>(rng: &mut R) -> AccountNumber {
    let a1 = rng.gen_range(0..1000u32);
    let a2 = rng.gen_range(0..10u32);
    let a3 = rng.gen_range(0..100000u32);
    let body = format!("{:03}{:01}{:05}", a1, a2, a3);
    AccountNumber::from_body(&body)
}

/// Generate a 16-character transaction reference: 8 digits, 3 uppercase
/// letters, 5 digits.
pub fn transaction_ref<R: Rng + ?Sized>(rng: &mut R) -> TransactionRef {
    let d8 = format!("{:08}", rng.gen_range(0..100_000_000u32));
    let letters: String = (0..3)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect();
    let d5 = format!("{:05}", rng.gen_range(0..100_000u32));
    TransactionRef::from_parts(&d8, &letters, &d5)
}
