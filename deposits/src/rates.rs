//! Duration tier table and interest arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

use tellercore_common::{Money, Result};

/// Annual rate tiers by duration, ascending. A requested duration maps to
/// the smallest tier at least as long; durations past the largest tier get
/// the largest tier's rate.
fn tiers() -> [(u32, Decimal); 8] {
    [
        (1, Decimal::new(10, 3)),  // 1.0%
        (3, Decimal::new(15, 3)),  // 1.5%
        (6, Decimal::new(20, 3)),  // 2.0%
        (12, Decimal::new(25, 3)), // 2.5%
        (24, Decimal::new(30, 3)), // 3.0%
        (36, Decimal::new(35, 3)), // 3.5%
        (48, Decimal::new(40, 3)), // 4.0%
        (60, Decimal::new(45, 3)), // 4.5%
    ]
}

/// Annual interest rate for a deposit of `duration_months`.
pub fn annual_rate_for(duration_months: u32) -> Decimal {
    let tiers = tiers();
    tiers
        .iter()
        .find(|(months, _)| *months >= duration_months)
        .map(|(_, rate)| *rate)
        .unwrap_or(tiers[tiers.len() - 1].1)
}

/// Interest earned over the full term:
/// `principal × annual_rate × (duration_months / 12)`, computed in exact
/// decimal arithmetic and rounded to 2 fraction digits, half up.
pub fn interest_for(principal: Money, annual_rate: Decimal, duration_months: u32) -> Result<Money> {
    let years = Decimal::from(duration_months) / Decimal::from(12);
    let interest = (principal.to_decimal() * annual_rate * years)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Money::from_decimal(interest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exact_tier_rates() {
        assert_eq!(annual_rate_for(1), dec!(0.010));
        assert_eq!(annual_rate_for(3), dec!(0.015));
        assert_eq!(annual_rate_for(6), dec!(0.020));
        assert_eq!(annual_rate_for(12), dec!(0.025));
        assert_eq!(annual_rate_for(24), dec!(0.030));
        assert_eq!(annual_rate_for(36), dec!(0.035));
        assert_eq!(annual_rate_for(48), dec!(0.040));
        assert_eq!(annual_rate_for(60), dec!(0.045));
    }

    #[test]
    fn test_between_tiers_rounds_up_to_next() {
        assert_eq!(annual_rate_for(2), dec!(0.015));
        assert_eq!(annual_rate_for(7), dec!(0.025));
        assert_eq!(annual_rate_for(13), dec!(0.030));
        assert_eq!(annual_rate_for(59), dec!(0.045));
    }

    #[test]
    fn test_beyond_largest_tier_uses_largest_rate() {
        assert_eq!(annual_rate_for(61), dec!(0.045));
        assert_eq!(annual_rate_for(120), dec!(0.045));
    }

    #[test]
    fn test_full_year_interest_exact() {
        // 100.00 at 2.5% over 12 months -> 2.50.
        let interest = interest_for(
            Money::from_minor_units(10_000),
            dec!(0.025),
            12,
        )
        .unwrap();
        assert_eq!(interest, Money::from_minor_units(250));
    }

    #[test]
    fn test_fractional_year_rounds_half_up() {
        // 90.00 at 1% over 1 month -> 0.075 -> 0.08.
        let interest = interest_for(Money::from_minor_units(9_000), dec!(0.010), 1).unwrap();
        assert_eq!(interest, Money::from_minor_units(8));

        // 100.00 at 1% over 1 month -> 0.0833... -> 0.08.
        let interest = interest_for(Money::from_minor_units(10_000), dec!(0.010), 1).unwrap();
        assert_eq!(interest, Money::from_minor_units(8));
    }

    #[test]
    fn test_multi_year_interest() {
        // 1000.00 at 4.5% over 60 months -> 225.00.
        let interest = interest_for(Money::from_minor_units(100_000), dec!(0.045), 60).unwrap();
        assert_eq!(interest, Money::from_minor_units(22_500));
    }
}
