//! Owner identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Numeric identity of the account a slot belongs to.
///
/// Kept as the given digit string so that leading zeros and values
/// wider than any integer type survive a round trip through the panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Parses an owner identifier, requiring a non-empty run of ASCII digits.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidOwnerId`] for empty or non-numeric input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if is_numeric(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DomainError::InvalidOwnerId(raw))
        }
    }

    /// Returns the digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// True when `value` is a non-empty string of ASCII digits.
#[must_use]
pub fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OwnerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<OwnerId> for String {
    fn from(value: OwnerId) -> Self {
        value.0
    }
}

impl From<u64> for OwnerId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}
