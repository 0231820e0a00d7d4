//! In-memory billing store.
//!
//! One `RwLock` guards the whole state, so every commit checks its
//! preconditions and applies its changes under a single write lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tuition_core::bursary::{Bursary, BursaryAllocator};
use tuition_core::fee_structure::{BillingFrequency, FeeStructure};
use tuition_core::payment::Payment;
use tuition_core::proration::ActivityFee;
use tuition_core::student_fee::StudentFee;
use tuition_core::{FeeError, FeeResult};
use tuition_shared::types::{
    ActivityFeeId, BursaryId, FeeStructureId, PaymentId, SchoolId, StudentFeeId, StudentId,
    TenantId, UserId,
};

use crate::store::{BillingStore, PaymentCommit, StudentFeeCommit};

#[derive(Debug, Default)]
struct State {
    fee_structures: HashMap<FeeStructureId, FeeStructure>,
    bursaries: HashMap<BursaryId, Bursary>,
    activity_fees: HashMap<ActivityFeeId, ActivityFee>,
    student_fees: HashMap<StudentFeeId, StudentFee>,
    payments: HashMap<PaymentId, Payment>,
    receipt_sequences: HashMap<(TenantId, i32), u64>,
}

impl State {
    fn duplicate_student_fee(&self, fee: &StudentFee) -> Option<&StudentFee> {
        self.student_fees.values().find(|f| {
            f.id != fee.id
                && f.tenant_id == fee.tenant_id
                && f.student_id == fee.student_id
                && f.academic_year == fee.academic_year
                && f.frequency == fee.frequency
        })
    }

    fn receipt_taken(&self, payment: &Payment) -> bool {
        payment.receipt_number.as_ref().is_some_and(|receipt| {
            self.payments.values().any(|p| {
                p.id != payment.id
                    && p.tenant_id == payment.tenant_id
                    && p.receipt_number.as_ref() == Some(receipt)
            })
        })
    }

    fn check_fee_version(&self, fee: &StudentFee, expected: i64) -> FeeResult<()> {
        let stored = self
            .student_fees
            .get(&fee.id)
            .filter(|f| f.tenant_id == fee.tenant_id)
            .ok_or_else(|| FeeError::not_found("student_fee", fee.id))?;
        if stored.version != expected {
            return Err(FeeError::conflict(
                "student_fee",
                fee.id,
                format!("version {expected}"),
                format!("version {}", stored.version),
            ));
        }
        Ok(())
    }
}

/// Billing store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn insert_fee_structure(&self, structure: &FeeStructure) -> FeeResult<()> {
        let mut state = self.state.write().await;
        if structure.is_active
            && state.fee_structures.values().any(|s| {
                s.is_active
                    && s.tenant_id == structure.tenant_id
                    && s.matches(
                        structure.school_id,
                        structure.grade_level,
                        &structure.academic_year,
                    )
            })
        {
            return Err(FeeError::DataIntegrity {
                constraint: "one_active_fee_structure",
                detail: format!(
                    "school {} grade {} year {} already has an active structure",
                    structure.school_id, structure.grade_level, structure.academic_year
                ),
            });
        }
        state.fee_structures.insert(structure.id, structure.clone());
        Ok(())
    }

    async fn get_fee_structure(
        &self,
        tenant_id: TenantId,
        id: FeeStructureId,
    ) -> FeeResult<Option<FeeStructure>> {
        let state = self.state.read().await;
        Ok(state
            .fee_structures
            .get(&id)
            .filter(|s| s.tenant_id == tenant_id)
            .cloned())
    }

    async fn active_fee_structures(
        &self,
        tenant_id: TenantId,
        school_id: SchoolId,
        grade_level: u8,
        academic_year: &str,
    ) -> FeeResult<Vec<FeeStructure>> {
        let state = self.state.read().await;
        Ok(state
            .fee_structures
            .values()
            .filter(|s| {
                s.tenant_id == tenant_id
                    && s.is_active
                    && s.matches(school_id, grade_level, academic_year)
            })
            .cloned()
            .collect())
    }

    async fn deactivate_fee_structure(
        &self,
        tenant_id: TenantId,
        id: FeeStructureId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> FeeResult<Option<FeeStructure>> {
        let mut state = self.state.write().await;
        let Some(structure) = state
            .fee_structures
            .get_mut(&id)
            .filter(|s| s.tenant_id == tenant_id)
        else {
            return Ok(None);
        };
        structure.is_active = false;
        structure.audit = structure.audit.touched(actor, at);
        Ok(Some(structure.clone()))
    }

    async fn insert_bursary(&self, bursary: &Bursary) -> FeeResult<()> {
        self.state
            .write()
            .await
            .bursaries
            .insert(bursary.id, bursary.clone());
        Ok(())
    }

    async fn get_bursary(&self, tenant_id: TenantId, id: BursaryId) -> FeeResult<Option<Bursary>> {
        let state = self.state.read().await;
        Ok(state
            .bursaries
            .get(&id)
            .filter(|b| b.tenant_id == tenant_id)
            .cloned())
    }

    async fn insert_activity_fee(&self, fee: &ActivityFee) -> FeeResult<()> {
        self.state
            .write()
            .await
            .activity_fees
            .insert(fee.id, fee.clone());
        Ok(())
    }

    async fn activity_fees(
        &self,
        tenant_id: TenantId,
        ids: &[ActivityFeeId],
    ) -> FeeResult<Vec<ActivityFee>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.activity_fees.get(id))
            .filter(|f| f.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn get_student_fee(
        &self,
        tenant_id: TenantId,
        id: StudentFeeId,
    ) -> FeeResult<Option<StudentFee>> {
        let state = self.state.read().await;
        Ok(state
            .student_fees
            .get(&id)
            .filter(|f| f.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_student_fee(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        academic_year: &str,
        frequency: BillingFrequency,
    ) -> FeeResult<Option<StudentFee>> {
        let state = self.state.read().await;
        Ok(state
            .student_fees
            .values()
            .find(|f| {
                f.tenant_id == tenant_id
                    && f.student_id == student_id
                    && f.academic_year == academic_year
                    && f.frequency == frequency
            })
            .cloned())
    }

    async fn list_student_fees(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> FeeResult<Vec<StudentFee>> {
        let state = self.state.read().await;
        let mut fees: Vec<StudentFee> = state
            .student_fees
            .values()
            .filter(|f| f.tenant_id == tenant_id && f.student_id == student_id)
            .cloned()
            .collect();
        fees.sort_by(|a, b| {
            (&a.academic_year, a.frequency.as_str()).cmp(&(&b.academic_year, b.frequency.as_str()))
        });
        Ok(fees)
    }

    async fn get_payment(&self, tenant_id: TenantId, id: PaymentId) -> FeeResult<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .get(&id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_payments(
        &self,
        tenant_id: TenantId,
        student_fee_id: StudentFeeId,
    ) -> FeeResult<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.student_fee_id == student_fee_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.audit.created_at, p.id));
        Ok(payments)
    }

    async fn next_receipt_sequence(&self, tenant_id: TenantId, year: i32) -> FeeResult<u64> {
        let mut state = self.state.write().await;
        let last = state.receipt_sequences.entry((tenant_id, year)).or_insert(0);
        *last += 1;
        Ok(*last)
    }

    async fn commit_student_fee(&self, commit: StudentFeeCommit) -> FeeResult<StudentFee> {
        let mut state = self.state.write().await;
        let StudentFeeCommit {
            mut fee,
            expected_version,
            adjustments,
        } = commit;

        if let Some(existing) = state.duplicate_student_fee(&fee) {
            return Err(FeeError::DataIntegrity {
                constraint: "one_student_fee_per_frequency",
                detail: format!(
                    "student {} already has {} fee {} for {}",
                    fee.student_id, fee.frequency, existing.id, fee.academic_year
                ),
            });
        }

        match expected_version {
            None if state.student_fees.contains_key(&fee.id) => {
                return Err(FeeError::conflict("student_fee", fee.id, "absent", "present"));
            }
            None => fee.version = 1,
            Some(expected) => {
                state.check_fee_version(&fee, expected)?;
                fee.version = expected + 1;
            }
        }

        // Stage every counter change before touching state
        let mut staged: HashMap<BursaryId, Bursary> = HashMap::new();
        for adjustment in adjustments {
            let id = adjustment.bursary_id();
            let mut bursary = match staged.remove(&id) {
                Some(b) => b,
                None => state
                    .bursaries
                    .get(&id)
                    .filter(|b| b.tenant_id == fee.tenant_id)
                    .cloned()
                    .ok_or_else(|| FeeError::not_found("bursary", id))?,
            };
            BursaryAllocator::apply_adjustment(&mut bursary, adjustment)?;
            staged.insert(id, bursary);
        }

        state.bursaries.extend(staged);
        state.student_fees.insert(fee.id, fee.clone());
        Ok(fee)
    }

    async fn commit_payment(&self, commit: PaymentCommit) -> FeeResult<(Payment, StudentFee)> {
        let mut state = self.state.write().await;
        let PaymentCommit {
            payment,
            expected_status,
            mut fee,
            expected_fee_version,
        } = commit;

        let stored = state
            .payments
            .get(&payment.id)
            .filter(|p| p.tenant_id == payment.tenant_id);
        match (expected_status, stored) {
            (None, None) => {}
            (None, Some(_)) => {
                return Err(FeeError::conflict("payment", payment.id, "absent", "present"));
            }
            (Some(expected), Some(current)) if current.status == expected => {}
            (Some(expected), Some(current)) => {
                return Err(FeeError::conflict(
                    "payment",
                    payment.id,
                    expected,
                    current.status,
                ));
            }
            (Some(_), None) => return Err(FeeError::not_found("payment", payment.id)),
        }

        state.check_fee_version(&fee, expected_fee_version)?;

        if state.receipt_taken(&payment) {
            return Err(FeeError::DataIntegrity {
                constraint: "unique_receipt_number",
                detail: format!(
                    "receipt {} already issued",
                    payment.receipt_number.as_deref().unwrap_or_default()
                ),
            });
        }

        fee.version = expected_fee_version + 1;
        state.payments.insert(payment.id, payment.clone());
        state.student_fees.insert(fee.id, fee.clone());
        Ok((payment, fee))
    }
}
