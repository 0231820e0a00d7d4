//! Payment repository: recording payments and driving their lifecycle.
//!
//! Every write re-settles the owning student fee from its full payment list
//! and commits both together, so `total_paid` always equals the sum of the
//! fee's completed payments.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, instrument};
use tuition_core::payment::{
    NewPayment, Payment, PaymentEvent, PaymentLedger, PaymentLifecycle, PaymentStatus,
    ReceiptNumber,
};
use tuition_core::student_fee::StudentFee;
use tuition_core::{FeeError, FeeResult};
use tuition_shared::BillingConfig;
use tuition_shared::types::{PaymentId, StudentFeeId, TenantId, UserId};

use crate::retry::retry_on_conflict;
use crate::store::{BillingStore, PaymentCommit};

/// A payment together with its fee as settled by the same commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledPayment {
    /// The payment.
    pub payment: Payment,
    /// The owning fee with recomputed totals.
    pub student_fee: StudentFee,
}

/// Payment repository.
#[derive(Debug)]
pub struct PaymentRepository<S> {
    store: Arc<S>,
    config: BillingConfig,
}

impl<S: BillingStore> PaymentRepository<S> {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(store: Arc<S>, config: BillingConfig) -> Self {
        Self { store, config }
    }

    /// Records a payment as an authorization hold or a settled payment.
    /// A settled payment receives its receipt number immediately.
    ///
    /// # Errors
    ///
    /// * `FeeError::NotFound` if the fee does not exist
    /// * `FeeError::Validation` if the amount is not positive or exceeds what
    ///   is still owed after outstanding holds
    #[instrument(
        skip(self, input),
        fields(tenant_id = %tenant_id, student_fee_id = %input.student_fee_id, amount = %input.amount)
    )]
    pub async fn record(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        input: NewPayment,
    ) -> FeeResult<SettledPayment> {
        let input = &input;
        retry_on_conflict(self.config.max_conflict_retries, move || {
            self.try_record(tenant_id, actor, input.clone())
        })
        .await
    }

    async fn try_record(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        input: NewPayment,
    ) -> FeeResult<SettledPayment> {
        let now = Utc::now();
        let fee = self.student_fee(tenant_id, input.student_fee_id).await?;
        let mut payments = self.store.list_payments(tenant_id, fee.id).await?;
        PaymentLedger::validate_new_payment(&fee, &payments, input.amount)?;

        let status = PaymentLifecycle::initial(input.intent);
        let mut payment = Payment::new(tenant_id, input, status, actor, now);
        if PaymentLifecycle::needs_receipt(&payment) {
            self.issue_receipt(&mut payment, now).await?;
        }

        payments.push(payment.clone());
        let settled = self.commit(fee, payment, None, &payments, now).await?;
        info!(
            payment_id = %settled.payment.id,
            status = %settled.payment.status,
            receipt_number = ?settled.payment.receipt_number,
            balance = %settled.student_fee.balance,
            "Payment recorded"
        );
        Ok(settled)
    }

    /// Captures a held payment and issues its receipt. Confirming a payment
    /// that is already completed changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::InvalidTransition` unless the payment is pending or
    /// completed.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, payment_id = %id))]
    pub async fn confirm(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: PaymentId,
    ) -> FeeResult<SettledPayment> {
        self.transition(tenant_id, actor, id, PaymentEvent::Confirm).await
    }

    /// Releases a held payment.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::InvalidTransition` unless the payment is pending.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, payment_id = %id))]
    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: PaymentId,
    ) -> FeeResult<SettledPayment> {
        self.transition(tenant_id, actor, id, PaymentEvent::Cancel).await
    }

    /// Records a processor decline of a held payment.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::InvalidTransition` unless the payment is pending.
    #[instrument(skip(self, reason), fields(tenant_id = %tenant_id, payment_id = %id))]
    pub async fn fail(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: PaymentId,
        reason: Option<String>,
    ) -> FeeResult<SettledPayment> {
        self.transition(tenant_id, actor, id, PaymentEvent::Fail { reason })
            .await
    }

    /// Refunds a completed payment. The receipt number is kept.
    ///
    /// # Errors
    ///
    /// * `FeeError::Validation` if the reason is blank
    /// * `FeeError::InvalidTransition` unless the payment is completed
    #[instrument(skip(self, reason), fields(tenant_id = %tenant_id, payment_id = %id))]
    pub async fn refund(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: PaymentId,
        reason: String,
    ) -> FeeResult<SettledPayment> {
        self.transition(tenant_id, actor, id, PaymentEvent::Refund { reason })
            .await
    }

    /// Loads a payment.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::NotFound` if it does not exist.
    pub async fn get(&self, tenant_id: TenantId, id: PaymentId) -> FeeResult<Payment> {
        self.store
            .get_payment(tenant_id, id)
            .await?
            .ok_or_else(|| FeeError::not_found("payment", id))
    }

    /// All payments against a fee, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn list_for_fee(
        &self,
        tenant_id: TenantId,
        student_fee_id: StudentFeeId,
    ) -> FeeResult<Vec<Payment>> {
        self.store.list_payments(tenant_id, student_fee_id).await
    }

    async fn transition(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: PaymentId,
        event: PaymentEvent,
    ) -> FeeResult<SettledPayment> {
        let event = &event;
        retry_on_conflict(self.config.max_conflict_retries, move || {
            self.try_transition(tenant_id, actor, id, event.clone())
        })
        .await
    }

    async fn try_transition(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: PaymentId,
        event: PaymentEvent,
    ) -> FeeResult<SettledPayment> {
        let now = Utc::now();
        let mut payment = self.get(tenant_id, id).await?;
        let fee = self.student_fee(tenant_id, payment.student_fee_id).await?;

        let prior = payment.status;
        if !PaymentLifecycle::apply(&mut payment, event, actor, now)? {
            debug!(payment_id = %id, status = %prior, "Transition is a no-op");
            return Ok(SettledPayment {
                payment,
                student_fee: fee,
            });
        }
        if PaymentLifecycle::needs_receipt(&payment) {
            self.issue_receipt(&mut payment, now).await?;
        }

        let mut payments = self.store.list_payments(tenant_id, fee.id).await?;
        if let Some(stored) = payments.iter_mut().find(|p| p.id == payment.id) {
            *stored = payment.clone();
        }

        let settled = self.commit(fee, payment, Some(prior), &payments, now).await?;
        info!(
            payment_id = %id,
            from = %prior,
            to = %settled.payment.status,
            total_paid = %settled.student_fee.total_paid,
            balance = %settled.student_fee.balance,
            "Payment transitioned"
        );
        Ok(settled)
    }

    async fn student_fee(&self, tenant_id: TenantId, id: StudentFeeId) -> FeeResult<StudentFee> {
        self.store
            .get_student_fee(tenant_id, id)
            .await?
            .ok_or_else(|| FeeError::not_found("student_fee", id))
    }

    async fn issue_receipt(&self, payment: &mut Payment, at: DateTime<Utc>) -> FeeResult<()> {
        let year = at.year();
        let sequence = self
            .store
            .next_receipt_sequence(payment.tenant_id, year)
            .await?;
        let receipt = ReceiptNumber::new(&self.config.receipt_prefix, year, sequence)?;
        PaymentLifecycle::issue_receipt(payment, receipt)
    }

    async fn commit(
        &self,
        mut fee: StudentFee,
        payment: Payment,
        expected_status: Option<PaymentStatus>,
        payments: &[Payment],
        at: DateTime<Utc>,
    ) -> FeeResult<SettledPayment> {
        let expected_fee_version = fee.version;
        PaymentLedger::settle(&mut fee, payments, at.date_naive());
        fee.audit = fee.audit.touched(payment.audit.updated_by, at);

        let (payment, student_fee) = self
            .store
            .commit_payment(PaymentCommit {
                payment,
                expected_status,
                fee,
                expected_fee_version,
            })
            .await?;
        Ok(SettledPayment {
            payment,
            student_fee,
        })
    }
}
