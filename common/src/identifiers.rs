//! Identifier types for TellerCore entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::TellerError;

/// A customer account number: exactly 6 ASCII digits.
///
/// Account numbers are re-validated at the engine boundary before touching
/// any store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Parse and validate an account number.
    pub fn parse(s: &str) -> Result<Self, TellerError> {
        if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(TellerError::InvalidAccountNumber(s.to_string()))
        }
    }

    /// Get the account number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountNumber {
    type Err = TellerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Unique identifier for a time deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepositId(Uuid);

impl DepositId {
    /// Create a new deposit ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DepositId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a journal record.
/// Uses UUID v7 so record ids sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new record ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_number_valid() {
        let n = AccountNumber::parse("123456").unwrap();
        assert_eq!(n.as_str(), "123456");
        assert_eq!(n.to_string(), "123456");
    }

    #[test]
    fn test_account_number_rejects_bad_input() {
        assert!(AccountNumber::parse("12345").is_err());
        assert!(AccountNumber::parse("1234567").is_err());
        assert!(AccountNumber::parse("12345a").is_err());
        assert!(AccountNumber::parse("").is_err());
        assert!(AccountNumber::parse("١٢٣٤٥٦").is_err());
    }

    #[test]
    fn test_account_number_ordering() {
        let a = AccountNumber::parse("123456").unwrap();
        let b = AccountNumber::parse("789012").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_deposit_id_unique() {
        assert_ne!(DepositId::new(), DepositId::new());
    }

    #[test]
    fn test_deposit_id_parse_round_trip() {
        let id = DepositId::new();
        let parsed = DepositId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
