//! Student fee calculation.
//!
//! Combines the fee structure's pricing, prorated activity charges, the
//! discount stack and an optional bursary into a [`FeeBreakdown`]. The same
//! function backs both the unpersisted preview and generate/recalculate.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tuition_shared::ProrationUnit;
use tuition_shared::types::{BursaryId, FeeStructureId, Money, Percent};

use crate::bursary::{Bursary, BursaryAllocator};
use crate::discount::{DiscountCalculator, DiscountInput, SiblingDiscountTable};
use crate::error::FeeError;
use crate::fee_structure::{BillingFrequency, FeeStructure, FrequencyPricing};
use crate::proration::{ActivityFee, Prorater};
use crate::student_fee::types::{ActivityCharge, ActivityEnrollment};

/// Everything needed to price one student fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeComponents {
    /// Source structure.
    pub fee_structure_id: FeeStructureId,
    /// Grade level.
    pub grade_level: u8,
    /// Billing frequency.
    pub frequency: BillingFrequency,
    /// Tuition and frequency discount for `frequency`.
    pub pricing: FrequencyPricing,
    /// Material fee.
    pub material_fee: Money,
    /// Other fees.
    pub other_fees: Money,
    /// Prorated activity charges.
    pub activity_charges: Vec<ActivityCharge>,
    /// Rank among enrolled siblings.
    pub sibling_order: u32,
    /// Sibling rates.
    pub sibling_table: SiblingDiscountTable,
    /// Whether the sibling discount covers every component.
    pub apply_sibling_to_all: bool,
}

impl FeeComponents {
    /// Takes tuition, fees and sibling rules from a fee structure.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if the structure does not price `frequency`.
    pub fn from_structure(
        structure: &FeeStructure,
        frequency: BillingFrequency,
        sibling_order: u32,
        activity_charges: Vec<ActivityCharge>,
    ) -> Result<Self, FeeError> {
        Ok(Self {
            fee_structure_id: structure.id,
            grade_level: structure.grade_level,
            frequency,
            pricing: structure.pricing_for(frequency)?,
            material_fee: structure.material_fee,
            other_fees: structure.other_fees,
            activity_charges,
            sibling_order,
            sibling_table: structure.sibling_discounts,
            apply_sibling_to_all: structure.apply_sibling_to_all,
        })
    }

    /// Sum of the activity charges.
    #[must_use]
    pub fn activity_total(&self) -> Money {
        self.activity_charges.iter().map(|c| c.charged).sum()
    }
}

/// A fully computed fee, ready to be shown or snapshotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Source structure.
    pub fee_structure_id: FeeStructureId,
    /// Grade level.
    pub grade_level: u8,
    /// Billing frequency.
    pub frequency: BillingFrequency,
    /// Tuition before discounts.
    pub base_tuition: Money,
    /// Sum of activity charges.
    pub activity_fees: Money,
    /// Material fee.
    pub material_fees: Money,
    /// Other fees.
    pub other_fees: Money,
    /// Activity charges.
    pub activity_charges: Vec<ActivityCharge>,
    /// Frequency discount rate.
    pub frequency_discount_percent: Percent,
    /// Frequency discount amount.
    pub frequency_discount_amount: Money,
    /// Sibling order.
    pub sibling_order: u32,
    /// Sibling discount rate.
    pub sibling_discount_percent: Percent,
    /// Sibling discount amount.
    pub sibling_discount_amount: Money,
    /// Whether the sibling discount covered every component.
    pub apply_sibling_to_all: bool,
    /// Applied bursary.
    pub bursary_id: Option<BursaryId>,
    /// Bursary amount.
    pub bursary_amount: Money,
    /// Sum of all components.
    pub total_before_discounts: Money,
    /// Frequency plus sibling discount.
    pub total_discounts: Money,
    /// Due before the bursary: `max(0, before - discounts)`.
    pub pre_bursary_due: Money,
    /// Final amount due: `max(0, pre_bursary_due - bursary)`.
    pub total_due: Money,
}

/// Stateless student fee calculator.
pub struct StudentFeeCalculator;

impl StudentFeeCalculator {
    /// Prorates each enrollment against its activity fee.
    ///
    /// # Errors
    ///
    /// * `FeeError::NotFound` if an enrollment names an unknown activity fee
    /// * `FeeError::Validation` for a duplicate enrollment, a fee from another
    ///   academic year, or an enrollment after the activity period
    pub fn charge_activities(
        fees: &[ActivityFee],
        enrollments: &[ActivityEnrollment],
        academic_year: &str,
        unit: ProrationUnit,
    ) -> Result<Vec<ActivityCharge>, FeeError> {
        let mut seen = HashSet::with_capacity(enrollments.len());
        enrollments
            .iter()
            .map(|enrollment| {
                if !seen.insert(enrollment.activity_fee_id) {
                    return Err(FeeError::validation(
                        "activities",
                        "activity listed more than once",
                        enrollment.activity_fee_id,
                    ));
                }
                let fee = fees
                    .iter()
                    .find(|f| f.id == enrollment.activity_fee_id)
                    .ok_or_else(|| FeeError::not_found("activity_fee", enrollment.activity_fee_id))?;
                if fee.academic_year != academic_year {
                    return Err(FeeError::validation(
                        "activities",
                        "activity fee belongs to another academic year",
                        &fee.academic_year,
                    ));
                }
                let result = Prorater::charge(fee, enrollment.enrolled_on, unit)?;
                Ok(ActivityCharge {
                    activity_fee_id: fee.id,
                    activity_name: fee.activity_name.clone(),
                    enrolled_on: enrollment.enrolled_on,
                    full_amount: fee.amount,
                    charged: result.charge,
                    units_total: result.units_total,
                    units_charged: result.units_charged,
                })
            })
            .collect()
    }

    /// Computes the fee: discounts first, then the bursary on what remains.
    ///
    /// Bursary eligibility is not checked here; callers run
    /// [`BursaryAllocator::plan_change`] before committing.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for negative components or sibling order 0.
    pub fn calculate(
        components: &FeeComponents,
        bursary: Option<&Bursary>,
    ) -> Result<FeeBreakdown, FeeError> {
        let activity_fees = components.activity_total();
        let input = DiscountInput {
            tuition: components.pricing.base_amount,
            activity_fees,
            material_fees: components.material_fee,
            other_fees: components.other_fees,
            frequency_discount: components.pricing.discount_percent,
            sibling_order: components.sibling_order,
            sibling_table: components.sibling_table,
            apply_sibling_to_all: components.apply_sibling_to_all,
        };
        let discounts = DiscountCalculator::compute(&input)?;

        let total_before_discounts = input.total_before_discounts();
        let total_discounts = discounts.total();
        let pre_bursary_due = (total_before_discounts - total_discounts).clamp_zero();

        let bursary_amount = bursary.map_or(Money::ZERO, |b| {
            BursaryAllocator::coverage(b, pre_bursary_due, input.tuition)
        });
        let total_due = (pre_bursary_due - bursary_amount).clamp_zero();

        Ok(FeeBreakdown {
            fee_structure_id: components.fee_structure_id,
            grade_level: components.grade_level,
            frequency: components.frequency,
            base_tuition: input.tuition,
            activity_fees,
            material_fees: input.material_fees,
            other_fees: input.other_fees,
            activity_charges: components.activity_charges.clone(),
            frequency_discount_percent: discounts.frequency_discount_percent,
            frequency_discount_amount: discounts.frequency_discount_amount,
            sibling_order: components.sibling_order,
            sibling_discount_percent: discounts.sibling_discount_percent,
            sibling_discount_amount: discounts.sibling_discount_amount,
            apply_sibling_to_all: components.apply_sibling_to_all,
            bursary_id: bursary.map(|b| b.id),
            bursary_amount,
            total_before_discounts,
            total_discounts,
            pre_bursary_due,
            total_due,
        })
    }
}
