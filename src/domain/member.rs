//! Member model
//!
//! Members own accounts. Registration plumbing (password reset, profile
//! CRUD) lives outside the engine; the ledger only needs the owner lookup
//! for PIN verification and receipt addressing.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::citizen_id::CitizenId;

/// Opaque member identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// An account owner. `pin_hash` is the stored digest; the raw PIN never
/// reaches persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub citizen_id: CitizenId,
    pub pin_hash: String,
}

impl Member {
    /// Display name used by transaction views.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Partial profile update. Absent fields are left untouched; there is no
/// blank-string sentinel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl MemberPatch {
    pub fn apply(self, member: &mut Member) {
        if let Some(first_name) = self.first_name {
            member.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            member.last_name = last_name;
        }
        if let Some(email) = self.email {
            member.email = email;
        }
    }
}
