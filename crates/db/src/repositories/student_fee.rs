//! Student fee repository: preview, generation and recalculation.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, instrument};
use tuition_core::AuditStamp;
use tuition_core::bursary::{Bursary, BursaryAllocator};
use tuition_core::fee_structure::{BillingFrequency, FeeStructureResolver};
use tuition_core::student_fee::{
    ActivityCharge, ActivityEnrollment, BursaryChange, FeeBreakdown, FeeComponents,
    GenerateStudentFeeInput, RecalculateStudentFeeInput, StudentFee, StudentFeeCalculator,
};
use tuition_core::{FeeError, FeeResult};
use tuition_shared::BillingConfig;
use tuition_shared::types::{BursaryId, StudentFeeId, StudentId, TenantId, UserId};

use crate::retry::retry_on_conflict;
use crate::store::{BillingStore, StudentFeeCommit};

/// Student fee repository.
#[derive(Debug)]
pub struct StudentFeeRepository<S> {
    store: Arc<S>,
    config: BillingConfig,
}

impl<S: BillingStore> StudentFeeRepository<S> {
    /// Creates a new student fee repository.
    #[must_use]
    pub const fn new(store: Arc<S>, config: BillingConfig) -> Self {
        Self { store, config }
    }

    /// Computes what [`generate`](Self::generate) would bill, without writing.
    ///
    /// # Errors
    ///
    /// Any error `generate` would return except the duplicate check.
    pub async fn preview(
        &self,
        tenant_id: TenantId,
        input: &GenerateStudentFeeInput,
    ) -> FeeResult<FeeBreakdown> {
        let (components, bursary) = self.price(tenant_id, input).await?;
        BursaryAllocator::plan_change(
            None,
            bursary.as_ref(),
            input.grade_level,
            &input.academic_year,
            Utc::now().date_naive(),
        )?;
        StudentFeeCalculator::calculate(&components, bursary.as_ref())
    }

    /// Generates and stores a student's fee for one year and frequency,
    /// taking one place on the bursary if one is assigned.
    ///
    /// # Errors
    ///
    /// * `FeeError::DataIntegrity` if the student already has a fee for this
    ///   year and frequency, or the structure lookup is ambiguous
    /// * `FeeError::NotFound` for a missing structure, bursary or activity fee
    /// * Bursary eligibility errors
    /// * `FeeError::Conflict` if the bursary filled up on every attempt
    #[instrument(
        skip(self, input),
        fields(tenant_id = %tenant_id, student_id = %input.student_id, academic_year = %input.academic_year)
    )]
    pub async fn generate(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        input: GenerateStudentFeeInput,
    ) -> FeeResult<StudentFee> {
        let input = &input;
        retry_on_conflict(self.config.max_conflict_retries, move || {
            self.try_generate(tenant_id, actor, input)
        })
        .await
    }

    async fn try_generate(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        input: &GenerateStudentFeeInput,
    ) -> FeeResult<StudentFee> {
        let now = Utc::now();
        let today = now.date_naive();

        self.ensure_unbilled(tenant_id, input.student_id, &input.academic_year, input.frequency)
            .await?;

        let (components, bursary) = self.price(tenant_id, input).await?;
        let adjustments = BursaryAllocator::plan_change(
            None,
            bursary.as_ref(),
            input.grade_level,
            &input.academic_year,
            today,
        )?;
        let breakdown = StudentFeeCalculator::calculate(&components, bursary.as_ref())?;

        let due_date = input
            .due_date
            .unwrap_or_else(|| self.default_due_date(today));
        let fee = StudentFee::generate(
            tenant_id,
            input.student_id,
            input.academic_year.clone(),
            breakdown,
            due_date,
            AuditStamp::created(actor, now),
        );

        let fee = self
            .store
            .commit_student_fee(StudentFeeCommit {
                fee,
                expected_version: None,
                adjustments,
            })
            .await?;

        info!(
            student_fee_id = %fee.id,
            frequency = %fee.frequency,
            total_due = %fee.total_due,
            bursary_id = ?fee.bursary_id,
            "Student fee generated"
        );
        Ok(fee)
    }

    /// Recomputes a stored fee after a change of frequency, bursary, sibling
    /// order, component amounts or activities. Every derived field is
    /// replaced; payments already made are kept and re-settled.
    ///
    /// The fee is re-priced from the structure it was generated from, even if
    /// that structure has since been deactivated.
    ///
    /// # Errors
    ///
    /// * `FeeError::NotFound` if the fee or anything it references is missing
    /// * `FeeError::DataIntegrity` if a new frequency is already billed
    /// * Bursary eligibility errors for a newly assigned bursary
    /// * `FeeError::Conflict` if the fee kept changing underneath
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, student_fee_id = %id))]
    pub async fn recalculate(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: StudentFeeId,
        input: RecalculateStudentFeeInput,
    ) -> FeeResult<StudentFee> {
        let input = &input;
        retry_on_conflict(self.config.max_conflict_retries, move || {
            self.try_recalculate(tenant_id, actor, id, input)
        })
        .await
    }

    async fn try_recalculate(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: StudentFeeId,
        input: &RecalculateStudentFeeInput,
    ) -> FeeResult<StudentFee> {
        let now = Utc::now();
        let today = now.date_naive();
        let current = self.get(tenant_id, id).await?;

        let frequency = input.frequency.unwrap_or(current.frequency);
        if frequency != current.frequency {
            self.ensure_unbilled(tenant_id, current.student_id, &current.academic_year, frequency)
                .await?;
        }

        let structure = self
            .store
            .get_fee_structure(tenant_id, current.fee_structure_id)
            .await?
            .ok_or_else(|| FeeError::not_found("fee_structure", current.fee_structure_id))?;

        let prior = self.load_bursary(tenant_id, current.bursary_id).await?;
        let next = match input.bursary {
            BursaryChange::Keep => prior.clone(),
            BursaryChange::Assign(bursary_id) => self.load_bursary(tenant_id, Some(bursary_id)).await?,
            BursaryChange::Remove => None,
        };
        let adjustments = BursaryAllocator::plan_change(
            prior.as_ref(),
            next.as_ref(),
            current.grade_level,
            &current.academic_year,
            today,
        )?;

        let enrollments = input
            .activities
            .clone()
            .unwrap_or_else(|| current.enrollments());
        let charges = self
            .charge_activities(tenant_id, &enrollments, &current.academic_year)
            .await?;

        let mut components = FeeComponents::from_structure(
            &structure,
            frequency,
            input.sibling_order.unwrap_or(current.sibling_order),
            charges,
        )?;
        components.material_fee = input.material_fee.unwrap_or(current.material_fees);
        components.other_fees = input.other_fees.unwrap_or(current.other_fees);
        let breakdown = StudentFeeCalculator::calculate(&components, next.as_ref())?;

        let expected_version = current.version;
        let previous_due = current.total_due;
        let mut fee = current;
        if let Some(due_date) = input.due_date {
            fee.due_date = due_date;
        }
        fee.apply_breakdown(breakdown, actor, now);

        let fee = self
            .store
            .commit_student_fee(StudentFeeCommit {
                fee,
                expected_version: Some(expected_version),
                adjustments,
            })
            .await?;

        info!(
            student_fee_id = %fee.id,
            previous_due = %previous_due,
            total_due = %fee.total_due,
            credit_balance = %fee.credit_balance,
            version = fee.version,
            "Student fee recalculated"
        );
        Ok(fee)
    }

    /// Loads a student fee.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::NotFound` if it does not exist.
    pub async fn get(&self, tenant_id: TenantId, id: StudentFeeId) -> FeeResult<StudentFee> {
        self.store
            .get_student_fee(tenant_id, id)
            .await?
            .ok_or_else(|| FeeError::not_found("student_fee", id))
    }

    /// Finds a student's fee for one year and frequency.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn find(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        academic_year: &str,
        frequency: BillingFrequency,
    ) -> FeeResult<Option<StudentFee>> {
        self.store
            .find_student_fee(tenant_id, student_id, academic_year, frequency)
            .await
    }

    /// All of a student's fees.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn list_for_student(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> FeeResult<Vec<StudentFee>> {
        self.store.list_student_fees(tenant_id, student_id).await
    }

    async fn ensure_unbilled(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        academic_year: &str,
        frequency: BillingFrequency,
    ) -> FeeResult<()> {
        match self
            .store
            .find_student_fee(tenant_id, student_id, academic_year, frequency)
            .await?
        {
            Some(existing) => Err(FeeError::DataIntegrity {
                constraint: "one_student_fee_per_frequency",
                detail: format!(
                    "student {student_id} already has {frequency} fee {} for {academic_year}",
                    existing.id
                ),
            }),
            None => Ok(()),
        }
    }

    async fn price(
        &self,
        tenant_id: TenantId,
        input: &GenerateStudentFeeInput,
    ) -> FeeResult<(FeeComponents, Option<Bursary>)> {
        let candidates = self
            .store
            .active_fee_structures(
                tenant_id,
                input.school_id,
                input.grade_level,
                &input.academic_year,
            )
            .await?;
        let structure = FeeStructureResolver::resolve(
            &candidates,
            input.school_id,
            input.grade_level,
            &input.academic_year,
        )?;

        let charges = self
            .charge_activities(tenant_id, &input.activities, &input.academic_year)
            .await?;
        let mut components =
            FeeComponents::from_structure(structure, input.frequency, input.sibling_order, charges)?;
        if let Some(material_fee) = input.material_fee_override {
            components.material_fee = material_fee;
        }
        if let Some(other_fees) = input.other_fees_override {
            components.other_fees = other_fees;
        }

        let bursary = self.load_bursary(tenant_id, input.bursary_id).await?;
        Ok((components, bursary))
    }

    async fn charge_activities(
        &self,
        tenant_id: TenantId,
        enrollments: &[ActivityEnrollment],
        academic_year: &str,
    ) -> FeeResult<Vec<ActivityCharge>> {
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<_> = enrollments.iter().map(|e| e.activity_fee_id).collect();
        let fees = self.store.activity_fees(tenant_id, &ids).await?;
        StudentFeeCalculator::charge_activities(
            &fees,
            enrollments,
            academic_year,
            self.config.proration_unit,
        )
    }

    async fn load_bursary(
        &self,
        tenant_id: TenantId,
        id: Option<BursaryId>,
    ) -> FeeResult<Option<Bursary>> {
        let Some(id) = id else {
            return Ok(None);
        };
        self.store
            .get_bursary(tenant_id, id)
            .await?
            .map(Some)
            .ok_or_else(|| FeeError::not_found("bursary", id))
    }

    fn default_due_date(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_days(Days::new(u64::from(self.config.default_due_days)))
            .unwrap_or(NaiveDate::MAX)
    }
}
