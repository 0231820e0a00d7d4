//! Settling a student fee against its payments.
//!
//! `total_paid` is always recomputed from the full payment list rather than
//! adjusted incrementally, so a missed or repeated event cannot make it drift.

use chrono::NaiveDate;
use tuition_shared::types::Money;

use crate::error::FeeError;
use crate::payment::types::{Payment, PaymentStatus};
use crate::student_fee::StudentFee;

/// Stateless payment ledger.
pub struct PaymentLedger;

impl PaymentLedger {
    /// Sum of completed payments belonging to `fee`.
    #[must_use]
    pub fn total_paid(fee: &StudentFee, payments: &[Payment]) -> Money {
        payments
            .iter()
            .filter(|p| p.student_fee_id == fee.id && p.status.counts_toward_balance())
            .map(|p| p.amount)
            .sum()
    }

    /// Sum of authorization holds not yet confirmed.
    #[must_use]
    pub fn pending_total(fee: &StudentFee, payments: &[Payment]) -> Money {
        payments
            .iter()
            .filter(|p| p.student_fee_id == fee.id && p.status == PaymentStatus::Pending)
            .map(|p| p.amount)
            .sum()
    }

    /// Checks a new payment amount against what is still owed.
    ///
    /// Outstanding holds count as committed, so two holds cannot together
    /// exceed the balance.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if the amount is not positive or
    /// exceeds the outstanding balance.
    pub fn validate_new_payment(
        fee: &StudentFee,
        payments: &[Payment],
        amount: Money,
    ) -> Result<(), FeeError> {
        if !amount.is_positive() {
            return Err(FeeError::validation("amount", "must be positive", amount));
        }
        let outstanding = (fee.balance - Self::pending_total(fee, payments)).clamp_zero();
        if amount > outstanding {
            return Err(FeeError::Validation {
                field: "amount",
                constraint: "must not exceed the outstanding balance",
                value: format!("{amount} > {outstanding}"),
            });
        }
        Ok(())
    }

    /// Recomputes `total_paid`, balance, credit and status from `payments`.
    ///
    /// Returns the new `total_paid`.
    pub fn settle(fee: &mut StudentFee, payments: &[Payment], today: NaiveDate) -> Money {
        let total_paid = Self::total_paid(fee, payments);
        fee.refresh_totals(total_paid, today);
        total_paid
    }
}
