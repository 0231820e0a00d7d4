//! Bursary eligibility, coverage and recipient accounting.
//!
//! The allocator is the only source of bursary business-rule errors. Counter
//! changes are returned as [`RecipientAdjustment`]s rather than applied, so
//! the store can commit them together with the student fee.

use chrono::NaiveDate;
use tuition_shared::types::Money;

use crate::bursary::types::{Bursary, Coverage, CreateBursaryInput, RecipientAdjustment};
use crate::error::FeeError;

/// Stateless bursary rules.
pub struct BursaryAllocator;

impl BursaryAllocator {
    /// Validates a bursary definition.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for a blank name or year, an inverted
    /// grade range, zero capacity, or a fixed amount outside `0..=Money::MAX`.
    pub fn validate_definition(input: &CreateBursaryInput) -> Result<(), FeeError> {
        if input.name.trim().is_empty() {
            return Err(FeeError::validation("name", "is required", "<empty>"));
        }
        if input.academic_year.trim().is_empty() {
            return Err(FeeError::validation("academic_year", "is required", "<empty>"));
        }
        if input.min_grade > input.max_grade {
            return Err(FeeError::validation(
                "min_grade",
                "must not exceed max_grade",
                format!("{} > {}", input.min_grade, input.max_grade),
            ));
        }
        if input.max_recipients == 0 {
            return Err(FeeError::validation("max_recipients", "must be at least 1", 0));
        }
        if let Coverage::FixedAmount(amount) = input.coverage {
            FeeError::check_amount("coverage_value", amount)?;
        }
        Ok(())
    }

    /// Checks whether a student can be newly assigned this bursary.
    ///
    /// Rules are checked in order: active, academic year, deadline, grade
    /// range, capacity.
    ///
    /// # Errors
    ///
    /// * `FeeError::BursaryIneligible` for an inactive bursary, a year
    ///   mismatch, or a grade outside the range
    /// * `FeeError::BursaryExpired` if `today` is after the deadline
    /// * `FeeError::BursaryFull` if no places remain
    pub fn check_eligibility(
        bursary: &Bursary,
        grade_level: u8,
        academic_year: &str,
        today: NaiveDate,
    ) -> Result<(), FeeError> {
        if !bursary.is_active {
            return Err(FeeError::BursaryIneligible {
                bursary_id: bursary.id,
                constraint: "is_active",
                current: "inactive".to_string(),
                attempted: "assignment".to_string(),
            });
        }

        if bursary.academic_year != academic_year {
            return Err(FeeError::BursaryIneligible {
                bursary_id: bursary.id,
                constraint: "academic_year",
                current: bursary.academic_year.clone(),
                attempted: academic_year.to_string(),
            });
        }

        if let Some(deadline) = bursary.application_deadline
            && today > deadline
        {
            return Err(FeeError::BursaryExpired {
                bursary_id: bursary.id,
                deadline,
                attempted: today,
            });
        }

        if grade_level < bursary.min_grade || grade_level > bursary.max_grade {
            return Err(FeeError::BursaryIneligible {
                bursary_id: bursary.id,
                constraint: "grade_level",
                current: format!("{}..={}", bursary.min_grade, bursary.max_grade),
                attempted: grade_level.to_string(),
            });
        }

        if bursary.current_recipients >= bursary.max_recipients {
            return Err(FeeError::BursaryFull {
                bursary_id: bursary.id,
                current: bursary.current_recipients,
                max: bursary.max_recipients,
            });
        }

        Ok(())
    }

    /// Amount the bursary covers.
    ///
    /// Never exceeds `pre_bursary_due`; full tuition coverage also never
    /// exceeds `base_tuition`.
    #[must_use]
    pub fn coverage(bursary: &Bursary, pre_bursary_due: Money, base_tuition: Money) -> Money {
        let cap = pre_bursary_due.clamp_zero();
        let covered = match bursary.coverage {
            Coverage::Percentage(pct) => cap.percent(pct),
            Coverage::FixedAmount(amount) => amount.clamp_zero(),
            Coverage::FullTuition => base_tuition.clamp_zero(),
        };
        covered.min(cap)
    }

    /// Plans the recipient counter changes for moving a student from `prior`
    /// to `next`, checking eligibility for a newly assigned bursary.
    ///
    /// Keeping the same bursary produces no adjustment and no capacity check,
    /// since the student is already counted.
    ///
    /// # Errors
    ///
    /// Returns the eligibility error for `next` if it is newly assigned.
    pub fn plan_change(
        prior: Option<&Bursary>,
        next: Option<&Bursary>,
        grade_level: u8,
        academic_year: &str,
        today: NaiveDate,
    ) -> Result<Vec<RecipientAdjustment>, FeeError> {
        match (prior, next) {
            (Some(p), Some(n)) if p.id == n.id => Ok(Vec::new()),
            (prior, next) => {
                let mut adjustments = Vec::with_capacity(2);
                if let Some(n) = next {
                    Self::check_eligibility(n, grade_level, academic_year, today)?;
                    adjustments.push(RecipientAdjustment::Increment(n.id));
                }
                if let Some(p) = prior {
                    adjustments.push(RecipientAdjustment::Decrement(p.id));
                }
                Ok(adjustments)
            }
        }
    }

    /// Applies an adjustment to an in-memory bursary, enforcing the same
    /// preconditions the store checks on commit.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Conflict` if the counter would leave `0..=max`.
    pub fn apply_adjustment(bursary: &mut Bursary, adjustment: RecipientAdjustment) -> Result<(), FeeError> {
        match adjustment {
            RecipientAdjustment::Increment(_) => {
                if bursary.current_recipients >= bursary.max_recipients {
                    return Err(FeeError::conflict(
                        "bursary",
                        bursary.id,
                        format!("current_recipients < {}", bursary.max_recipients),
                        bursary.current_recipients,
                    ));
                }
                bursary.current_recipients += 1;
            }
            RecipientAdjustment::Decrement(_) => {
                if bursary.current_recipients == 0 {
                    return Err(FeeError::conflict(
                        "bursary",
                        bursary.id,
                        "current_recipients > 0",
                        0,
                    ));
                }
                bursary.current_recipients -= 1;
            }
        }
        bursary.version += 1;
        Ok(())
    }
}
