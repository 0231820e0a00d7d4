//! Activity fee repository.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use tuition_core::proration::{ActivityFee, CreateActivityFeeInput, Prorater, ProrationResult};
use tuition_core::{FeeError, FeeResult};
use tuition_shared::BillingConfig;
use tuition_shared::types::{ActivityFeeId, TenantId, UserId};

use crate::store::BillingStore;

/// Activity fee repository.
#[derive(Debug)]
pub struct ActivityFeeRepository<S> {
    store: Arc<S>,
    config: BillingConfig,
}

impl<S: BillingStore> ActivityFeeRepository<S> {
    /// Creates a new activity fee repository.
    #[must_use]
    pub const fn new(store: Arc<S>, config: BillingConfig) -> Self {
        Self { store, config }
    }

    /// Creates an activity fee.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for an invalid definition.
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, activity = %input.activity_name))]
    pub async fn create(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        input: CreateActivityFeeInput,
    ) -> FeeResult<ActivityFee> {
        let fee = ActivityFee::create(tenant_id, input, actor, Utc::now())?;
        self.store.insert_activity_fee(&fee).await?;
        info!(activity_fee_id = %fee.id, amount = %fee.amount, "Activity fee created");
        Ok(fee)
    }

    /// Loads an activity fee.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::NotFound` if it does not exist.
    pub async fn get(&self, tenant_id: TenantId, id: ActivityFeeId) -> FeeResult<ActivityFee> {
        self.store
            .activity_fees(tenant_id, &[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FeeError::not_found("activity_fee", id))
    }

    /// What a student enrolling on `enrolled_on` would be charged, using the
    /// configured proration unit.
    ///
    /// # Errors
    ///
    /// * `FeeError::NotFound` if the fee does not exist
    /// * `FeeError::Validation` if the date is after the activity period
    pub async fn preview_charge(
        &self,
        tenant_id: TenantId,
        id: ActivityFeeId,
        enrolled_on: NaiveDate,
    ) -> FeeResult<ProrationResult> {
        let fee = self.get(tenant_id, id).await?;
        Prorater::charge(&fee, enrolled_on, self.config.proration_unit)
    }
}
