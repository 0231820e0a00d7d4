//! Fee structure repository.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use tuition_core::fee_structure::{CreateFeeStructureInput, FeeStructure, FeeStructureResolver};
use tuition_core::{FeeError, FeeResult};
use tuition_shared::types::{FeeStructureId, SchoolId, TenantId, UserId};

use crate::store::BillingStore;

/// Fee structure repository.
#[derive(Debug)]
pub struct FeeStructureRepository<S> {
    store: Arc<S>,
}

impl<S: BillingStore> FeeStructureRepository<S> {
    /// Creates a new fee structure repository.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates an active fee structure.
    ///
    /// # Errors
    ///
    /// * `FeeError::Validation` for an invalid definition
    /// * `FeeError::DataIntegrity` if the school, grade and year already have
    ///   an active structure
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, school_id = %input.school_id))]
    pub async fn create(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        input: CreateFeeStructureInput,
    ) -> FeeResult<FeeStructure> {
        let structure = FeeStructure::create(tenant_id, input, actor, Utc::now())?;

        let existing = self
            .store
            .active_fee_structures(
                tenant_id,
                structure.school_id,
                structure.grade_level,
                &structure.academic_year,
            )
            .await?;
        if let Some(active) = existing.first() {
            return Err(FeeError::DataIntegrity {
                constraint: "one_active_fee_structure",
                detail: format!(
                    "structure {} is already active for grade {} year {}",
                    active.id, structure.grade_level, structure.academic_year
                ),
            });
        }

        self.store.insert_fee_structure(&structure).await?;
        info!(
            fee_structure_id = %structure.id,
            grade_level = structure.grade_level,
            academic_year = %structure.academic_year,
            "Fee structure created"
        );
        Ok(structure)
    }

    /// Loads a fee structure, active or not.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::NotFound` if it does not exist.
    pub async fn get(&self, tenant_id: TenantId, id: FeeStructureId) -> FeeResult<FeeStructure> {
        self.store
            .get_fee_structure(tenant_id, id)
            .await?
            .ok_or_else(|| FeeError::not_found("fee_structure", id))
    }

    /// Resolves the single active structure for a school, grade and year.
    ///
    /// # Errors
    ///
    /// * `FeeError::NotFound` if there is none
    /// * `FeeError::DataIntegrity` if there is more than one
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        school_id: SchoolId,
        grade_level: u8,
        academic_year: &str,
    ) -> FeeResult<FeeStructure> {
        let candidates = self
            .store
            .active_fee_structures(tenant_id, school_id, grade_level, academic_year)
            .await?;
        FeeStructureResolver::resolve(&candidates, school_id, grade_level, academic_year).cloned()
    }

    /// Retires a structure. Fees already generated from it keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::NotFound` if it does not exist.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, fee_structure_id = %id))]
    pub async fn deactivate(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: FeeStructureId,
    ) -> FeeResult<FeeStructure> {
        let structure = self
            .store
            .deactivate_fee_structure(tenant_id, id, actor, Utc::now())
            .await?
            .ok_or_else(|| FeeError::not_found("fee_structure", id))?;
        info!(fee_structure_id = %id, "Fee structure deactivated");
        Ok(structure)
    }
}
