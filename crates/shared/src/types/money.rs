//! Money and percentage types with fixed two-place precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! `Money` wraps `rust_decimal::Decimal` and is always normalised to
//! two decimal places using half-up rounding.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places carried by every monetary value.
pub const MONEY_SCALE: u32 = 2;

fn normalise(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

fn saturating_mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(if a.is_sign_negative() == b.is_sign_negative() {
        Decimal::MAX
    } else {
        Decimal::MIN
    })
}

/// A monetary amount in the school's single billing currency.
///
/// Construction always rounds half-up to two decimal places, so two values
/// that print the same compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero, carried at two decimal places.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    /// Largest amount a stored billing column holds: 999,999,999,999.99.
    pub const MAX: Self = Self(Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, MONEY_SCALE));

    /// Creates a new amount, rounding half-up to two decimal places.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(normalise(amount))
    }

    /// Creates an amount from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns the amount, or zero if it is negative.
    #[must_use]
    pub fn clamp_zero(self) -> Self {
        if self.is_negative() { Self::ZERO } else { self }
    }

    /// Returns `pct` percent of this amount, rounded once.
    ///
    /// Saturates at the `Decimal` range instead of panicking; callers keep
    /// inputs within `Money::MAX`.
    #[must_use]
    pub fn percent(self, pct: Percent) -> Self {
        Self::new(saturating_mul(self.0, pct.value()) / Decimal::ONE_HUNDRED)
    }

    /// Returns this amount reduced by `pct` percent: `round(self × (1 − pct/100))`.
    ///
    /// The rounding is applied to the reduced amount itself, so the result is
    /// never larger than `self` for a non-negative amount.
    #[must_use]
    pub fn less_percent(self, pct: Percent) -> Self {
        Self::new(saturating_mul(self.0, Decimal::ONE_HUNDRED - pct.value()) / Decimal::ONE_HUNDRED)
    }

    /// Multiplies by a whole number of units.
    #[must_use]
    pub fn times(self, units: u32) -> Self {
        Self::new(saturating_mul(self.0, Decimal::from(units)))
    }

    /// Divides into `units` equal shares, rounded. Returns `None` for zero units.
    #[must_use]
    pub fn per_unit(self, units: u32) -> Option<Self> {
        if units == 0 {
            return None;
        }
        Some(Self::new(self.0 / Decimal::from(units)))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Error returned when a percentage falls outside 0..=100 or carries more
/// than two decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Percentage must be between 0 and 100 with at most two decimal places, got {0}")]
pub struct PercentError(pub Decimal);

/// A percentage in the closed range 0..=100, at most two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

impl Percent {
    /// Zero percent.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// One hundred percent.
    pub const HUNDRED: Self = Self(Decimal::ONE_HUNDRED);

    /// Creates a percentage, rejecting values outside 0..=100 or with more
    /// than two decimal places.
    pub fn new(value: Decimal) -> Result<Self, PercentError> {
        if value < Decimal::ZERO
            || value > Decimal::ONE_HUNDRED
            || value.normalize().scale() > MONEY_SCALE
        {
            return Err(PercentError(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw percentage value (e.g. `10` for 10%).
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true for 0%.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = PercentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for Decimal {
    fn from(pct: Percent) -> Self {
        pct.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_new_rounds_half_up() {
        assert_eq!(Money::new(dec!(10.005)).amount(), dec!(10.01));
        assert_eq!(Money::new(dec!(10.004)).amount(), dec!(10.00));
        assert_eq!(Money::new(dec!(-10.005)).amount(), dec!(-10.01));
    }

    #[test]
    fn test_money_display_has_two_places() {
        assert_eq!(Money::new(dec!(8000)).to_string(), "8000.00");
        assert_eq!(Money::from_cents(7250).to_string(), "72.50");
    }

    #[test]
    fn test_zero_displays_two_places() {
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::default(), Money::new(Decimal::ZERO));
    }

    #[test]
    fn test_money_clamp_zero() {
        assert_eq!(Money::new(dec!(-5)).clamp_zero(), Money::ZERO);
        assert_eq!(Money::new(dec!(5)).clamp_zero(), Money::new(dec!(5)));
    }

    #[rstest]
    #[case(dec!(8000), dec!(10), dec!(7200.00))]
    #[case(dec!(7200), dec!(10), dec!(6480.00))]
    #[case(dec!(99.99), dec!(15), dec!(84.99))]
    #[case(dec!(100), dec!(0), dec!(100.00))]
    #[case(dec!(100), dec!(100), dec!(0.00))]
    fn test_less_percent(#[case] base: Decimal, #[case] pct: Decimal, #[case] expected: Decimal) {
        let pct = Percent::new(pct).unwrap();
        assert_eq!(Money::new(base).less_percent(pct).amount(), expected);
    }

    #[test]
    fn test_percent_of_amount() {
        let pct = Percent::new(dec!(12.5)).unwrap();
        assert_eq!(Money::new(dec!(100.10)).percent(pct).amount(), dec!(12.51));
    }

    #[test]
    fn test_per_unit_and_times() {
        let rate = Money::new(dec!(100)).per_unit(3).unwrap();
        assert_eq!(rate.amount(), dec!(33.33));
        assert_eq!(rate.times(2).amount(), dec!(66.66));
        assert!(Money::new(dec!(100)).per_unit(0).is_none());
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_cents(150), Money::from_cents(250)].iter().sum();
        assert_eq!(total, Money::from_cents(400));
    }

    #[test]
    fn test_percent_bounds() {
        assert!(Percent::new(dec!(0)).is_ok());
        assert!(Percent::new(dec!(100)).is_ok());
        assert_eq!(Percent::new(dec!(100.01)), Err(PercentError(dec!(100.01))));
        assert!(Percent::new(dec!(-1)).is_err());
    }

    #[rstest]
    #[case(dec!(12.345), false)]
    #[case(dec!(0.001), false)]
    #[case(dec!(12.35), true)]
    #[case(dec!(10.000), true)]
    fn test_percent_precision(#[case] value: Decimal, #[case] accepted: bool) {
        assert_eq!(Percent::new(value).is_ok(), accepted);
    }

    #[test]
    fn test_money_max_is_column_limit() {
        assert_eq!(Money::MAX.amount(), dec!(999999999999.99));
        assert!(Money::new(dec!(1000000000000.00)) > Money::MAX);
    }

    #[test]
    fn test_percent_of_huge_amount_saturates() {
        let huge = Money::new(Decimal::MAX / Decimal::TEN);
        let pct = Percent::new(dec!(10)).unwrap();
        assert!(huge.less_percent(pct).is_positive());
        assert!(huge.percent(pct).is_positive());
    }

    proptest! {
        /// round(b × (1 − d/100), 2) never exceeds b.
        #[test]
        fn prop_less_percent_never_exceeds_base(cents in 0i64..100_000_000, bp in 0u32..=10_000) {
            let base = Money::from_cents(cents);
            let pct = Percent::new(Decimal::new(i64::from(bp), 2)).unwrap();
            let reduced = base.less_percent(pct);
            prop_assert!(reduced <= base);
            prop_assert!(!reduced.is_negative());
            prop_assert_eq!(reduced.amount().scale(), MONEY_SCALE);
        }
    }
}
