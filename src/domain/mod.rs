//! Domain module
//!
//! Validated primitives and records shared by the engine and the stores.

pub mod account;
pub mod citizen_id;
pub mod member;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountNumber, AccountNumberError, AccountStatus};
pub use citizen_id::CitizenId;
pub use member::{Member, MemberId, MemberPatch};
pub use money::{Amount, AmountError, Balance};
pub use transaction::{
    Transaction, TransactionKind, TransactionRef, TransactionRefError, TransactionStatus,
};
