//! Account model
//!
//! Account numbers are structured and checksummed; statuses form a closed
//! enumeration with explicit transition rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::member::MemberId;
use super::money::Balance;

/// A checksummed account number, canonical display form `DDD-D-DDDDD-C`.
///
/// Parsing strips every non-digit character first, so formatted and bare
/// inputs resolve to the same number. The trailing digit is the sum of the
/// nine random digits mod 10.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountNumberError {
    #[error("Account number must contain exactly 10 digits (got {0})")]
    WrongLength(usize),

    #[error("Account number checksum mismatch (expected {expected}, got {got})")]
    ChecksumMismatch { expected: u32, got: u32 },
}

/// Checksum over the nine leading digits: digit sum mod 10.
pub fn checksum_digit(digits: &str) -> u32 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .sum::<u32>()
        % 10
}

impl AccountNumber {
    /// Parse from any formatting, canonicalizing to digits and verifying the
    /// checksum.
    pub fn parse(input: &str) -> Result<Self, AccountNumberError> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 10 {
            return Err(AccountNumberError::WrongLength(digits.len()));
        }

        let expected = checksum_digit(&digits[..9]);
        let got = digits[9..]
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .unwrap_or(u32::MAX);
        if expected != got {
            return Err(AccountNumberError::ChecksumMismatch { expected, got });
        }

        Ok(Self(format!(
            "{}-{}-{}-{}",
            &digits[..3],
            &digits[3..4],
            &digits[4..9],
            &digits[9..]
        )))
    }

    /// Build from the nine random digits, computing the checksum. Used by the
    /// identifier generator.
    pub(crate) fn from_body(digits9: &str) -> Self {
        debug_assert_eq!(digits9.len(), 9);
        let check = checksum_digit(digits9);
        Self(format!(
            "{}-{}-{}-{}",
            &digits9[..3],
            &digits9[3..4],
            &digits9[4..9],
            check
        ))
    }

    /// Canonical display form, e.g. `431-7-99003-6`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 10 bare digits, used as the canonical lookup key.
    pub fn digits(&self) -> String {
        self.0.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// Trailing four digits, used as the receipt unlock code.
    pub fn last4(&self) -> String {
        let digits = self.digits();
        digits[digits.len() - 4..].to_string()
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = AccountNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

/// Account status, a closed enumeration.
///
/// Transitions: ACTIVE <-> FROZEN, ACTIVE -> CLOSED, FROZEN -> CLOSED.
/// CLOSED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn is_active(self) -> bool {
        self == AccountStatus::Active
    }

    /// Whether an administrative status change to `next` is allowed.
    pub fn can_transition_to(self, next: AccountStatus) -> bool {
        use AccountStatus::*;
        matches!(
            (self, next),
            (Active, Frozen) | (Frozen, Active) | (Active, Closed) | (Frozen, Closed)
        )
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Frozen => write!(f, "frozen"),
            AccountStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Legacy rows carry free-text statuses; compare case-insensitively.
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "frozen" => Ok(AccountStatus::Frozen),
            "closed" => Ok(AccountStatus::Closed),
            other => Err(format!("Invalid account status: {}", other)),
        }
    }
}

/// A customer account: the unit whose balance the ledger mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub number: AccountNumber,
    pub member_id: MemberId,
    pub balance: Balance,
    pub status: AccountStatus,
    pub opened_at: DateTime<Utc>,
}

impl Account {
    /// A freshly opened account: zero balance, active.
    pub fn open(number: AccountNumber, member_id: MemberId, opened_at: DateTime<Utc>) -> Self {
        Self {
            number,
            member_id,
            balance: Balance::zero(),
            status: AccountStatus::Active,
            opened_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
