//! Bursary repository.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use tuition_core::bursary::{Bursary, BursaryAllocator, CreateBursaryInput};
use tuition_core::{FeeError, FeeResult};
use tuition_shared::types::{BursaryId, TenantId, UserId};

use crate::store::BillingStore;

/// Bursary repository.
///
/// Recipient counters are never written here; they move only inside a
/// student fee commit.
#[derive(Debug)]
pub struct BursaryRepository<S> {
    store: Arc<S>,
}

impl<S: BillingStore> BursaryRepository<S> {
    /// Creates a new bursary repository.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates an active bursary with no recipients.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for an invalid definition.
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id))]
    pub async fn create(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        input: CreateBursaryInput,
    ) -> FeeResult<Bursary> {
        let bursary = Bursary::create(tenant_id, input, actor, Utc::now())?;
        self.store.insert_bursary(&bursary).await?;
        info!(
            bursary_id = %bursary.id,
            coverage_type = bursary.coverage.coverage_type().as_str(),
            max_recipients = bursary.max_recipients,
            "Bursary created"
        );
        Ok(bursary)
    }

    /// Loads a bursary.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::NotFound` if it does not exist.
    pub async fn get(&self, tenant_id: TenantId, id: BursaryId) -> FeeResult<Bursary> {
        self.store
            .get_bursary(tenant_id, id)
            .await?
            .ok_or_else(|| FeeError::not_found("bursary", id))
    }

    /// Checks whether a student in `grade_level` could be assigned the
    /// bursary today. Returns the bursary when eligible.
    ///
    /// # Errors
    ///
    /// Returns the first failed eligibility rule.
    pub async fn check_eligibility(
        &self,
        tenant_id: TenantId,
        id: BursaryId,
        grade_level: u8,
        academic_year: &str,
    ) -> FeeResult<Bursary> {
        let bursary = self.get(tenant_id, id).await?;
        BursaryAllocator::check_eligibility(
            &bursary,
            grade_level,
            academic_year,
            Utc::now().date_naive(),
        )?;
        Ok(bursary)
    }
}
