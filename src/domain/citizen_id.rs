//! National-ID checksum validation
//!
//! Pure precondition gate used before member registration. The 13th digit is
//! a check digit over the first twelve, weighted 13 down to 2.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validate a 13-digit national ID string.
pub fn is_valid(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let mut sum: u32 = 0;
    let mut weight: u32 = 13;
    for b in &bytes[..12] {
        sum += u32::from(b - b'0') * weight;
        weight -= 1;
    }

    let check = (11 - sum % 11) % 10;
    check == u32::from(bytes[12] - b'0')
}

/// A validated national ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CitizenId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid citizen ID: {0}")]
pub struct CitizenIdError(pub String);

impl CitizenId {
    pub fn parse(input: &str) -> Result<Self, CitizenIdError> {
        if !is_valid(input) {
            return Err(CitizenIdError(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CitizenId {
    type Err = CitizenIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CitizenId {
    type Error = CitizenIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CitizenId> for String {
    fn from(id: CitizenId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Build a valid ID from a 12-digit body by appending the check digit.
    fn with_check(body: &str) -> String {
        let sum: u32 = body
            .bytes()
            .enumerate()
            .map(|(i, b)| u32::from(b - b'0') * (13 - i as u32))
            .sum();
        format!("{}{}", body, (11 - sum % 11) % 10)
    }

    #[test]
    fn test_valid_id() {
        let id = with_check("110170020356");
        assert!(is_valid(&id));
        assert!(CitizenId::parse(&id).is_ok());
    }

    #[test]
    fn test_wrong_check_digit() {
        let id = with_check("110170020356");
        let mut chars: Vec<char> = id.chars().collect();
        let last = chars[12].to_digit(10).unwrap();
        chars[12] = char::from_digit((last + 1) % 10, 10).unwrap();
        let bad: String = chars.into_iter().collect();
        assert!(!is_valid(&bad));
    }

    #[test]
    fn test_rejects_non_digits_and_length() {
        assert!(!is_valid(""));
        assert!(!is_valid("12345"));
        assert!(!is_valid("1101700203561234"));
        assert!(!is_valid("11017002035a6"));
        assert!(CitizenId::parse("x").is_err());
    }
}
