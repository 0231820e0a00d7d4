//! Activity fee proration.
//!
//! Units (months or weeks) are anchored at the period start: unit `k` begins
//! at `period_start + k` units. A student is charged for every unit from the
//! one containing the enrollment date through the last unit, so enrolling
//! mid-unit still pays for that whole unit.

use chrono::{Days, Months, NaiveDate};
use tuition_shared::ProrationUnit;

use crate::error::FeeError;
use crate::proration::types::{ActivityFee, ProrationResult};

/// Stateless activity fee prorater.
pub struct Prorater;

impl Prorater {
    /// Computes the charge for a student enrolling on `enrolled_on`.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if the enrollment is after the period
    /// end or the period cannot be split into units.
    pub fn charge(
        fee: &ActivityFee,
        enrolled_on: NaiveDate,
        unit: ProrationUnit,
    ) -> Result<ProrationResult, FeeError> {
        if enrolled_on > fee.period_end {
            return Err(FeeError::validation(
                "enrolled_on",
                "must not be after the activity period end",
                format!("{enrolled_on} > {}", fee.period_end),
            ));
        }

        if !fee.is_proration_eligible() {
            return Ok(ProrationResult::full(fee.amount, 1));
        }

        let units_total = Self::units_in_period(fee.period_start, fee.period_end, unit)?;
        if enrolled_on <= fee.period_start {
            return Ok(ProrationResult::full(fee.amount, units_total));
        }

        // Index of the unit containing the enrollment date
        let elapsed = Self::units_in_period(fee.period_start, enrolled_on, unit)? - 1;
        let remaining = units_total - elapsed;
        if remaining == units_total {
            return Ok(ProrationResult::full(fee.amount, units_total));
        }

        let Some(rate) = fee.amount.per_unit(units_total) else {
            return Ok(ProrationResult::full(fee.amount, units_total));
        };
        let charge = rate.times(remaining).max(rate).min(fee.amount);

        Ok(ProrationResult {
            charge,
            units_total,
            units_charged: remaining,
            unit_rate: Some(rate),
            prorated: charge < fee.amount,
        })
    }

    /// Number of unit starts in `start..=end`.
    fn units_in_period(start: NaiveDate, end: NaiveDate, unit: ProrationUnit) -> Result<u32, FeeError> {
        let mut count: u32 = 0;
        loop {
            let Some(unit_start) = Self::unit_start(start, count, unit) else {
                return Err(FeeError::validation(
                    "period_end",
                    "period is too long to prorate",
                    end,
                ));
            };
            if unit_start > end {
                return Ok(count.max(1));
            }
            count += 1;
        }
    }

    fn unit_start(anchor: NaiveDate, k: u32, unit: ProrationUnit) -> Option<NaiveDate> {
        match unit {
            ProrationUnit::Month => anchor.checked_add_months(Months::new(k)),
            ProrationUnit::Week => anchor.checked_add_days(Days::new(7 * u64::from(k))),
        }
    }
}
