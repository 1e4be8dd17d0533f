//! Monetary primitives
//!
//! Domain primitives for money with business rule validation.
//! Values are validated at construction time so invalid amounts cannot
//! exist inside the engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum representable amount (1 trillion)
const MAX_AMOUNT: &str = "1000000000000";

/// Maximum decimal places (satang precision)
const MAX_SCALE: u32 = 2;

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 2 decimal places
/// - Never exceeds 1 trillion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Balance would become negative ({0})")]
    NegativeBalance(Decimal),

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        let max = Decimal::from_str(MAX_AMOUNT).map_err(|e| AmountError::ParseError(e.to_string()))?;
        if value > max {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create an Amount from an integer number of whole units.
    pub fn from_integer(value: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.2}", amount.0)
    }
}

/// Balance represents an account balance (zero or positive).
///
/// The ledger engine is the only writer of balances; every change goes
/// through `credit`/`debit`, which refuse to produce a negative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive).
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::NegativeBalance(value));
        }

        let max = Decimal::from_str(MAX_AMOUNT).map_err(|e| AmountError::ParseError(e.to_string()))?;
        if value > max {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// The zero balance every account opens with.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the balance covers a withdrawal of `amount`.
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add an amount to the balance.
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Subtract an amount from the balance.
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(Decimal::new(100, 0));
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), Decimal::new(100, 0));
    }

    #[test]
    fn test_amount_zero_rejected() {
        let amount = Amount::new(Decimal::ZERO);
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let amount = Amount::new(Decimal::new(-100, 0));
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_too_many_decimals() {
        // 0.123 has 3 decimal places
        let amount = Amount::new(Decimal::new(123, 3));
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(3))));
    }

    #[test]
    fn test_amount_max_decimals_ok() {
        let amount = Amount::new(Decimal::new(1250, 2));
        assert!(amount.is_ok());
    }

    #[test]
    fn test_amount_overflow() {
        let value = Decimal::from_str("1000000000001").unwrap();
        assert!(matches!(Amount::new(value), Err(AmountError::Overflow)));
    }

    #[test]
    fn test_amount_from_str() {
        let amount: Result<Amount, _> = "123.45".parse();
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), Decimal::new(12345, 2));
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::zero();
        let amount = Amount::from_integer(100).unwrap();

        let balance = balance.credit(&amount).unwrap();
        assert_eq!(balance.value(), Decimal::new(100, 0));

        let withdraw = Amount::from_integer(30).unwrap();
        let balance = balance.debit(&withdraw).unwrap();
        assert_eq!(balance.value(), Decimal::new(70, 0));
    }

    #[test]
    fn test_balance_never_negative() {
        let balance = Balance::new(Decimal::new(50, 0)).unwrap();
        let amount = Amount::from_integer(100).unwrap();

        assert!(!balance.is_sufficient_for(&amount));
        assert!(matches!(
            balance.debit(&amount),
            Err(AmountError::NegativeBalance(_))
        ));
    }
}
