//! Student fee snapshot types.
//!
//! A `StudentFee` copies every value it was priced from, so later edits to
//! the fee structure, bursary or activity fees never change a bill that has
//! already been issued. Only an explicit recalculation replaces the snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tuition_shared::types::{
    ActivityFeeId, BursaryId, FeeStructureId, Money, Percent, SchoolId, StudentFeeId, StudentId,
    TenantId, UserId,
};

use crate::audit::AuditStamp;
use crate::fee_structure::BillingFrequency;
use crate::student_fee::calculator::FeeBreakdown;

/// Collection status of a student fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    /// Nothing paid yet, not yet due.
    Pending,
    /// Partly paid, not yet due.
    Partial,
    /// Fully paid.
    Paid,
    /// Past the due date with a balance outstanding.
    ///
    /// Derived only when the fee is written (generation, recalculation,
    /// payment). Reads never re-evaluate it, so a fee nobody touches stays
    /// `Pending` past its due date until a batch sweep rewrites it.
    Overdue,
    /// Nothing to pay: discounts and bursary cover the whole fee.
    Waived,
}

impl FeeStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Waived => "waived",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "partial" => Some(Self::Partial),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "waived" => Some(Self::Waived),
            _ => None,
        }
    }

    /// Derives the status from the fee's totals. Overdue takes precedence
    /// over pending and partial.
    #[must_use]
    pub fn derive(
        total_due: Money,
        total_paid: Money,
        balance: Money,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        if total_due.is_zero() {
            Self::Waived
        } else if balance.is_zero() {
            Self::Paid
        } else if today > due_date {
            Self::Overdue
        } else if total_paid.is_positive() {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A student's enrollment in an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityEnrollment {
    /// The activity fee being charged.
    pub activity_fee_id: ActivityFeeId,
    /// The day the student joined.
    pub enrolled_on: NaiveDate,
}

/// A prorated activity charge, frozen on the student fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCharge {
    /// The activity fee charged.
    pub activity_fee_id: ActivityFeeId,
    /// Activity name at the time of charging.
    pub activity_name: String,
    /// The day the student joined.
    pub enrolled_on: NaiveDate,
    /// Full-period amount.
    pub full_amount: Money,
    /// Amount actually charged.
    pub charged: Money,
    /// Units in the period.
    pub units_total: u32,
    /// Units charged.
    pub units_charged: u32,
}

impl ActivityCharge {
    /// The enrollment this charge was computed from.
    #[must_use]
    pub fn enrollment(&self) -> ActivityEnrollment {
        ActivityEnrollment {
            activity_fee_id: self.activity_fee_id,
            enrolled_on: self.enrolled_on,
        }
    }
}

/// A student's bill for one academic year and billing frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFee {
    /// Student fee ID.
    pub id: StudentFeeId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The student billed.
    pub student_id: StudentId,
    /// Academic year.
    pub academic_year: String,
    /// Billing frequency.
    pub frequency: BillingFrequency,
    /// The structure the snapshot was taken from.
    pub fee_structure_id: FeeStructureId,
    /// Grade level at billing time.
    pub grade_level: u8,
    /// Tuition before discounts.
    pub base_tuition: Money,
    /// Sum of prorated activity charges.
    pub activity_fees: Money,
    /// Material fee.
    pub material_fees: Money,
    /// Other fees.
    pub other_fees: Money,
    /// Frequency discount rate.
    pub frequency_discount_percent: Percent,
    /// Frequency discount amount.
    pub frequency_discount_amount: Money,
    /// Rank among enrolled siblings, starting at 1.
    pub sibling_order: u32,
    /// Sibling discount rate.
    pub sibling_discount_percent: Percent,
    /// Sibling discount amount.
    pub sibling_discount_amount: Money,
    /// Whether the sibling discount covered every component.
    pub apply_sibling_to_all: bool,
    /// Assigned bursary.
    pub bursary_id: Option<BursaryId>,
    /// Amount the bursary covers.
    pub bursary_amount: Money,
    /// Sum of all components.
    pub total_before_discounts: Money,
    /// Frequency plus sibling discount.
    pub total_discounts: Money,
    /// `max(0, before - discounts - bursary)`.
    pub total_due: Money,
    /// Sum of completed payments.
    pub total_paid: Money,
    /// `max(0, total_due - total_paid)`.
    pub balance: Money,
    /// `max(0, total_paid - total_due)`, owed back to the payer.
    pub credit_balance: Money,
    /// Collection status.
    pub status: FeeStatus,
    /// Payment due date.
    pub due_date: NaiveDate,
    /// Activity charges.
    pub activity_charges: Vec<ActivityCharge>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Audit metadata.
    pub audit: AuditStamp,
}

impl StudentFee {
    /// Builds a new, unpaid student fee from a computed breakdown.
    #[must_use]
    pub fn generate(
        tenant_id: TenantId,
        student_id: StudentId,
        academic_year: String,
        breakdown: FeeBreakdown,
        due_date: NaiveDate,
        stamp: AuditStamp,
    ) -> Self {
        let mut fee = Self {
            id: StudentFeeId::new(),
            tenant_id,
            student_id,
            academic_year,
            frequency: breakdown.frequency,
            fee_structure_id: breakdown.fee_structure_id,
            grade_level: breakdown.grade_level,
            base_tuition: Money::ZERO,
            activity_fees: Money::ZERO,
            material_fees: Money::ZERO,
            other_fees: Money::ZERO,
            frequency_discount_percent: Percent::ZERO,
            frequency_discount_amount: Money::ZERO,
            sibling_order: 1,
            sibling_discount_percent: Percent::ZERO,
            sibling_discount_amount: Money::ZERO,
            apply_sibling_to_all: false,
            bursary_id: None,
            bursary_amount: Money::ZERO,
            total_before_discounts: Money::ZERO,
            total_discounts: Money::ZERO,
            total_due: Money::ZERO,
            total_paid: Money::ZERO,
            balance: Money::ZERO,
            credit_balance: Money::ZERO,
            status: FeeStatus::Pending,
            due_date,
            activity_charges: Vec::new(),
            version: 1,
            audit: stamp,
        };
        fee.replace_snapshot(breakdown);
        fee.refresh_totals(Money::ZERO, stamp.created_at.date_naive());
        fee
    }

    /// Replaces every derived field with a freshly computed breakdown.
    /// Payments already made are kept and the balance is re-derived.
    pub fn apply_breakdown(&mut self, breakdown: FeeBreakdown, actor: UserId, at: DateTime<Utc>) {
        self.replace_snapshot(breakdown);
        self.refresh_totals(self.total_paid, at.date_naive());
        self.audit = self.audit.touched(actor, at);
    }

    /// Re-derives balance, credit and status for a new paid total.
    pub fn refresh_totals(&mut self, total_paid: Money, today: NaiveDate) {
        self.total_paid = total_paid;
        self.balance = (self.total_due - total_paid).clamp_zero();
        self.credit_balance = (total_paid - self.total_due).clamp_zero();
        self.status = FeeStatus::derive(
            self.total_due,
            self.total_paid,
            self.balance,
            self.due_date,
            today,
        );
    }

    /// The student's current activity enrollments.
    #[must_use]
    pub fn enrollments(&self) -> Vec<ActivityEnrollment> {
        self.activity_charges.iter().map(ActivityCharge::enrollment).collect()
    }

    fn replace_snapshot(&mut self, b: FeeBreakdown) {
        self.frequency = b.frequency;
        self.fee_structure_id = b.fee_structure_id;
        self.grade_level = b.grade_level;
        self.base_tuition = b.base_tuition;
        self.activity_fees = b.activity_fees;
        self.material_fees = b.material_fees;
        self.other_fees = b.other_fees;
        self.frequency_discount_percent = b.frequency_discount_percent;
        self.frequency_discount_amount = b.frequency_discount_amount;
        self.sibling_order = b.sibling_order;
        self.sibling_discount_percent = b.sibling_discount_percent;
        self.sibling_discount_amount = b.sibling_discount_amount;
        self.apply_sibling_to_all = b.apply_sibling_to_all;
        self.bursary_id = b.bursary_id;
        self.bursary_amount = b.bursary_amount;
        self.total_before_discounts = b.total_before_discounts;
        self.total_discounts = b.total_discounts;
        self.total_due = b.total_due;
        self.activity_charges = b.activity_charges;
    }
}

/// Bursary instruction for a recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "action", content = "bursary_id", rename_all = "snake_case")]
pub enum BursaryChange {
    /// Keep the current bursary, if any.
    #[default]
    Keep,
    /// Assign this bursary, replacing any current one.
    Assign(BursaryId),
    /// Remove the current bursary.
    Remove,
}

/// Input for generating a student fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateStudentFeeInput {
    /// The student billed.
    pub student_id: StudentId,
    /// The student's school.
    pub school_id: SchoolId,
    /// The student's grade.
    pub grade_level: u8,
    /// Academic year.
    pub academic_year: String,
    /// Billing frequency.
    pub frequency: BillingFrequency,
    /// Rank among enrolled siblings, starting at 1.
    pub sibling_order: u32,
    /// Bursary to assign.
    pub bursary_id: Option<BursaryId>,
    /// Activity enrollments.
    #[serde(default)]
    pub activities: Vec<ActivityEnrollment>,
    /// Replaces the structure's material fee.
    pub material_fee_override: Option<Money>,
    /// Replaces the structure's other fees.
    pub other_fees_override: Option<Money>,
    /// Due date; defaults to the configured number of days from today.
    pub due_date: Option<NaiveDate>,
}

/// Input for recalculating a student fee. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecalculateStudentFeeInput {
    /// New billing frequency.
    pub frequency: Option<BillingFrequency>,
    /// Bursary change.
    #[serde(default)]
    pub bursary: BursaryChange,
    /// New sibling order.
    pub sibling_order: Option<u32>,
    /// New material fee.
    pub material_fee: Option<Money>,
    /// New other fees.
    pub other_fees: Option<Money>,
    /// Replacement activity enrollments.
    pub activities: Option<Vec<ActivityEnrollment>>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
}
