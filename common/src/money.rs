//! Fixed-point monetary amounts.
//!
//! All ledger arithmetic runs on an integer count of minor units (cents); a
//! `rust_decimal::Decimal` only appears at the parse boundary and for interest
//! math. Binary floating point is never used.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::TellerError;

/// A monetary amount as an exact number of minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(0);

    /// Maximum account balance: 1,000,000.00.
    pub const MAX_BALANCE: Money = Money(100_000_000);

    /// Per-transaction ceiling for deposits, withdrawals, transfers: 10,000.00.
    pub const MAX_TRANSACTION: Money = Money(1_000_000);

    /// Per-deposit ceiling for time deposits: 100,000.00.
    pub const MAX_TIME_DEPOSIT: Money = Money(10_000_000);

    /// Construct from an exact count of minor units.
    pub const fn from_minor_units(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Get the raw minor-unit count.
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Convert a decimal value, rejecting anything not representable at
    /// exactly 2 fraction digits or below zero.
    pub fn from_decimal(value: Decimal) -> Result<Self, TellerError> {
        if value.is_sign_negative() {
            return Err(TellerError::invalid_amount(value, "amount must not be negative"));
        }
        if value.normalize().scale() > 2 {
            return Err(TellerError::invalid_amount(
                value,
                "amount must have at most 2 decimal places",
            ));
        }
        let minor = (value * Decimal::ONE_HUNDRED).to_i64().ok_or_else(|| {
            TellerError::invalid_amount(value, "amount exceeds representable range")
        })?;
        Ok(Self(minor))
    }

    /// Validate a general transaction amount: positive, at most 2 fraction
    /// digits, and within the per-transaction ceiling.
    pub fn transaction_amount(value: Decimal) -> Result<Self, TellerError> {
        Self::bounded_amount(value, Self::MAX_TRANSACTION, "amount exceeds the 10,000.00 per-transaction limit")
    }

    /// Validate a time-deposit principal: positive, at most 2 fraction
    /// digits, and within the per-deposit ceiling.
    pub fn time_deposit_amount(value: Decimal) -> Result<Self, TellerError> {
        Self::bounded_amount(value, Self::MAX_TIME_DEPOSIT, "amount exceeds the 100,000.00 per-deposit limit")
    }

    fn bounded_amount(
        value: Decimal,
        ceiling: Money,
        ceiling_reason: &'static str,
    ) -> Result<Self, TellerError> {
        let amount = Self::from_decimal(value)?;
        if amount.is_zero() {
            return Err(TellerError::invalid_amount(value, "amount must be positive"));
        }
        if amount > ceiling {
            return Err(TellerError::invalid_amount(value, ceiling_reason));
        }
        Ok(amount)
    }

    /// Exact decimal representation with 2 fraction digits.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Check if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add, returning `None` on minor-unit overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtract, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        if other.0 > self.0 {
            None
        } else {
            Some(Money(self.0 - other.0))
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal().to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = Decimal::from_str_exact(&s).map_err(serde::de::Error::custom)?;
        Money::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_decimal_exact() {
        assert_eq!(Money::from_decimal(dec!(1000.00)).unwrap().minor_units(), 100_000);
        assert_eq!(Money::from_decimal(dec!(0.01)).unwrap().minor_units(), 1);
        assert_eq!(Money::from_decimal(dec!(10.5)).unwrap().minor_units(), 1050);
        assert_eq!(Money::from_decimal(dec!(0)).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_from_decimal_rejects_precision() {
        assert!(Money::from_decimal(dec!(100.123)).is_err());
        assert!(Money::from_decimal(dec!(0.001)).is_err());
        // Trailing zeros beyond 2 places are still exact at 2 places.
        assert!(Money::from_decimal(dec!(1.100)).is_ok());
    }

    #[test]
    fn test_from_decimal_rejects_negative() {
        assert!(Money::from_decimal(dec!(-1.00)).is_err());
    }

    #[test]
    fn test_transaction_amount_bounds() {
        assert!(Money::transaction_amount(dec!(10000.00)).is_ok());
        assert!(Money::transaction_amount(dec!(10000.01)).is_err());
        assert!(Money::transaction_amount(dec!(0)).is_err());
        assert!(Money::transaction_amount(dec!(0.00)).is_err());
    }

    #[test]
    fn test_time_deposit_amount_bounds() {
        assert!(Money::time_deposit_amount(dec!(100000.00)).is_ok());
        assert!(Money::time_deposit_amount(dec!(100000.01)).is_err());
    }

    #[test]
    fn test_checked_sub_never_negative() {
        let a = Money::from_minor_units(100);
        let b = Money::from_minor_units(150);
        assert_eq!(a.checked_sub(b), None);
        assert_eq!(b.checked_sub(a), Some(Money::from_minor_units(50)));
    }

    #[test]
    fn test_display_two_fraction_digits() {
        assert_eq!(Money::from_minor_units(100_000).to_string(), "1000.00");
        assert_eq!(Money::from_minor_units(5).to_string(), "0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_serde_round_trip() {
        let m = Money::from_minor_units(123_456);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"1234.56\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    proptest! {
        #[test]
        fn prop_decimal_round_trip(minor in 0i64..=100_000_000) {
            let m = Money::from_minor_units(minor);
            let back = Money::from_decimal(m.to_decimal()).unwrap();
            prop_assert_eq!(back, m);
        }

        #[test]
        fn prop_add_then_sub_restores(balance in 0i64..=100_000_000, amount in 1i64..=1_000_000) {
            let b = Money::from_minor_units(balance);
            let a = Money::from_minor_units(amount);
            let sum = b.checked_add(a).unwrap();
            prop_assert_eq!(sum.checked_sub(a).unwrap(), b);
        }
    }
}
