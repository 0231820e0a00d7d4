//! Discount calculator.
//!
//! Applies discounts in a fixed order so that the same inputs always produce
//! the same, auditable amounts:
//!
//! 1. Frequency discount on tuition.
//! 2. Sibling discount percent looked up from the sibling table.
//! 3. Sibling discount on the post-frequency tuition, or on the combined
//!    pre-discount total when `apply_sibling_to_all` is set.
//!
//! Bursaries are applied afterwards by the student fee calculator.

use serde::{Deserialize, Serialize};
use tuition_shared::types::{Money, Percent};

use crate::error::FeeError;

/// Sibling discount rates by birth order among enrolled siblings.
///
/// The eldest (order 1) never receives a sibling discount. Orders four and
/// above share a single rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiblingDiscountTable {
    /// Rate for the second child.
    pub second: Percent,
    /// Rate for the third child.
    pub third: Percent,
    /// Rate for the fourth child and beyond.
    pub fourth_plus: Percent,
}

impl SiblingDiscountTable {
    /// Returns the discount rate for a sibling order (1-based).
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for order 0.
    pub fn rate_for(&self, sibling_order: u32) -> Result<Percent, FeeError> {
        match sibling_order {
            0 => Err(FeeError::validation(
                "sibling_order",
                "must be 1 or greater",
                sibling_order,
            )),
            1 => Ok(Percent::ZERO),
            2 => Ok(self.second),
            3 => Ok(self.third),
            _ => Ok(self.fourth_plus),
        }
    }
}

/// Inputs to the discount stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountInput {
    /// Base tuition for the billing frequency.
    pub tuition: Money,
    /// Activity fee component (already prorated).
    pub activity_fees: Money,
    /// Material fee component.
    pub material_fees: Money,
    /// Other fee component.
    pub other_fees: Money,
    /// Discount for paying at this frequency.
    pub frequency_discount: Percent,
    /// The student's rank among enrolled siblings, starting at 1.
    pub sibling_order: u32,
    /// Sibling rates.
    pub sibling_table: SiblingDiscountTable,
    /// Whether the sibling discount covers all components or tuition only.
    pub apply_sibling_to_all: bool,
}

impl DiscountInput {
    /// Tuition plus every other component, before any discount.
    #[must_use]
    pub fn total_before_discounts(&self) -> Money {
        self.tuition + self.activity_fees + self.material_fees + self.other_fees
    }
}

/// Result of the discount stack. Each discount is reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountBreakdown {
    /// Frequency discount rate that was applied.
    pub frequency_discount_percent: Percent,
    /// Frequency discount amount.
    pub frequency_discount_amount: Money,
    /// Tuition after the frequency discount.
    pub tuition_after_frequency: Money,
    /// Sibling discount rate that was applied.
    pub sibling_discount_percent: Percent,
    /// The amount the sibling rate was applied to.
    pub sibling_discount_base: Money,
    /// Sibling discount amount.
    pub sibling_discount_amount: Money,
}

impl DiscountBreakdown {
    /// Frequency plus sibling discount.
    #[must_use]
    pub fn total(&self) -> Money {
        self.frequency_discount_amount + self.sibling_discount_amount
    }
}

/// Stateless discount calculator.
pub struct DiscountCalculator;

impl DiscountCalculator {
    /// Runs the discount stack.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for negative or oversized components, or
    /// a sibling order of zero.
    pub fn compute(input: &DiscountInput) -> Result<DiscountBreakdown, FeeError> {
        Self::validate(input)?;

        // 1. Frequency discount, rounded once on the reduced tuition
        let tuition_after_frequency = input.tuition.less_percent(input.frequency_discount);
        let frequency_discount_amount = input.tuition - tuition_after_frequency;

        // 2. Sibling rate
        let sibling_discount_percent = input.sibling_table.rate_for(input.sibling_order)?;

        // 3. Sibling discount base
        let sibling_discount_base = if input.apply_sibling_to_all {
            input.total_before_discounts()
        } else {
            tuition_after_frequency
        };
        let sibling_discount_amount = sibling_discount_base.percent(sibling_discount_percent);

        Ok(DiscountBreakdown {
            frequency_discount_percent: input.frequency_discount,
            frequency_discount_amount,
            tuition_after_frequency,
            sibling_discount_percent,
            sibling_discount_base,
            sibling_discount_amount,
        })
    }

    fn validate(input: &DiscountInput) -> Result<(), FeeError> {
        let components = [
            ("tuition", input.tuition),
            ("activity_fees", input.activity_fees),
            ("material_fees", input.material_fees),
            ("other_fees", input.other_fees),
        ];
        for (field, amount) in components {
            FeeError::check_amount(field, amount)?;
        }
        Ok(())
    }
}
