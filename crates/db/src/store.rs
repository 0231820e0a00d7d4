//! The persistence seam between repositories and storage backends.
//!
//! Reads are plain lookups scoped by tenant. Writes that touch balances or
//! bursary capacity go through the two `commit_*` methods, which are
//! compare-and-swap: they apply every change or none, and report a lost race
//! as `FeeError::Conflict` so the caller can re-read and retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tuition_core::FeeResult;
use tuition_core::bursary::{Bursary, RecipientAdjustment};
use tuition_core::fee_structure::{BillingFrequency, FeeStructure};
use tuition_core::payment::{Payment, PaymentStatus};
use tuition_core::proration::ActivityFee;
use tuition_core::student_fee::StudentFee;
use tuition_shared::types::{
    ActivityFeeId, BursaryId, FeeStructureId, PaymentId, SchoolId, StudentFeeId, StudentId,
    TenantId, UserId,
};

/// A student fee write together with the bursary counter changes it causes.
#[derive(Debug, Clone)]
pub struct StudentFeeCommit {
    /// The fee to write.
    pub fee: StudentFee,
    /// `None` inserts a new fee; `Some(v)` updates only if the stored version is `v`.
    pub expected_version: Option<i64>,
    /// Counter changes, each applied only while its precondition holds.
    pub adjustments: Vec<RecipientAdjustment>,
}

/// A payment write together with the owning fee's recomputed totals.
#[derive(Debug, Clone)]
pub struct PaymentCommit {
    /// The payment to write.
    pub payment: Payment,
    /// `None` inserts a new payment; `Some(s)` updates only if the stored status is `s`.
    pub expected_status: Option<PaymentStatus>,
    /// The owning fee with totals recomputed.
    pub fee: StudentFee,
    /// The fee is written only if the stored version is this.
    pub expected_fee_version: i64,
}

/// Storage backend for billing records.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Inserts a fee structure. Fails with `DataIntegrity` if another active
    /// structure exists for the same school, grade and year.
    async fn insert_fee_structure(&self, structure: &FeeStructure) -> FeeResult<()>;

    /// Loads a fee structure, active or not.
    async fn get_fee_structure(
        &self,
        tenant_id: TenantId,
        id: FeeStructureId,
    ) -> FeeResult<Option<FeeStructure>>;

    /// Active structures for a school, grade and year. Normally zero or one.
    async fn active_fee_structures(
        &self,
        tenant_id: TenantId,
        school_id: SchoolId,
        grade_level: u8,
        academic_year: &str,
    ) -> FeeResult<Vec<FeeStructure>>;

    /// Marks a structure inactive. Returns `None` if it does not exist.
    async fn deactivate_fee_structure(
        &self,
        tenant_id: TenantId,
        id: FeeStructureId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> FeeResult<Option<FeeStructure>>;

    /// Inserts a bursary.
    async fn insert_bursary(&self, bursary: &Bursary) -> FeeResult<()>;

    /// Loads a bursary.
    async fn get_bursary(&self, tenant_id: TenantId, id: BursaryId) -> FeeResult<Option<Bursary>>;

    /// Inserts an activity fee.
    async fn insert_activity_fee(&self, fee: &ActivityFee) -> FeeResult<()>;

    /// Loads the activity fees with the given IDs. Unknown IDs are skipped.
    async fn activity_fees(
        &self,
        tenant_id: TenantId,
        ids: &[ActivityFeeId],
    ) -> FeeResult<Vec<ActivityFee>>;

    /// Loads a student fee.
    async fn get_student_fee(
        &self,
        tenant_id: TenantId,
        id: StudentFeeId,
    ) -> FeeResult<Option<StudentFee>>;

    /// Finds the fee for a student, year and frequency.
    async fn find_student_fee(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        academic_year: &str,
        frequency: BillingFrequency,
    ) -> FeeResult<Option<StudentFee>>;

    /// All fees for a student.
    async fn list_student_fees(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> FeeResult<Vec<StudentFee>>;

    /// Loads a payment.
    async fn get_payment(&self, tenant_id: TenantId, id: PaymentId) -> FeeResult<Option<Payment>>;

    /// All payments against a fee, oldest first.
    async fn list_payments(
        &self,
        tenant_id: TenantId,
        student_fee_id: StudentFeeId,
    ) -> FeeResult<Vec<Payment>>;

    /// Reserves the next receipt sequence number for a tenant and year.
    /// Numbers are never handed out twice; an unused one leaves a gap.
    async fn next_receipt_sequence(&self, tenant_id: TenantId, year: i32) -> FeeResult<u64>;

    /// Writes a student fee and its bursary adjustments atomically.
    /// Returns the fee as stored, with its new version.
    async fn commit_student_fee(&self, commit: StudentFeeCommit) -> FeeResult<StudentFee>;

    /// Writes a payment and its fee's totals atomically.
    /// Returns both as stored.
    async fn commit_payment(&self, commit: PaymentCommit) -> FeeResult<(Payment, StudentFee)>;
}
