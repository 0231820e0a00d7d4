//! Fee structure domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tuition_shared::types::{FeeStructureId, Money, Percent, SchoolId, TenantId, UserId};

use crate::audit::AuditStamp;
use crate::discount::SiblingDiscountTable;
use crate::error::FeeError;

/// How often a student is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingFrequency {
    /// Twelve bills a year.
    Monthly,
    /// One bill per term.
    Termly,
    /// One bill for the whole year.
    Yearly,
}

impl BillingFrequency {
    /// Returns the string representation of the frequency.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Termly => "termly",
            Self::Yearly => "yearly",
        }
    }

    /// Parses a frequency from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "termly" => Some(Self::Termly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tuition price and frequency discount for one billing frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyPricing {
    /// Tuition before any discount.
    pub base_amount: Money,
    /// Discount for paying at this frequency.
    pub discount_percent: Percent,
}

/// Grade-level pricing template for one school year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStructure {
    /// Fee structure ID.
    pub id: FeeStructureId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// School this structure prices.
    pub school_id: SchoolId,
    /// Grade level.
    pub grade_level: u8,
    /// Academic year label, e.g. `"2025-2026"`.
    pub academic_year: String,
    /// Monthly pricing, if offered.
    pub monthly: Option<FrequencyPricing>,
    /// Termly pricing, if offered.
    pub termly: Option<FrequencyPricing>,
    /// Yearly pricing, if offered.
    pub yearly: Option<FrequencyPricing>,
    /// Material fee charged per bill.
    pub material_fee: Money,
    /// Other fees charged per bill.
    pub other_fees: Money,
    /// Sibling discount rates.
    pub sibling_discounts: SiblingDiscountTable,
    /// Whether the sibling discount applies to every component or tuition only.
    pub apply_sibling_to_all: bool,
    /// Only active structures are used for billing.
    pub is_active: bool,
    /// Audit metadata.
    pub audit: AuditStamp,
}

impl FeeStructure {
    /// Builds an active structure from validated input.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if the input is invalid.
    pub fn create(
        tenant_id: TenantId,
        input: CreateFeeStructureInput,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<Self, FeeError> {
        crate::fee_structure::resolver::FeeStructureService::validate(&input)?;
        Ok(Self {
            id: FeeStructureId::new(),
            tenant_id,
            school_id: input.school_id,
            grade_level: input.grade_level,
            academic_year: input.academic_year.trim().to_string(),
            monthly: input.monthly,
            termly: input.termly,
            yearly: input.yearly,
            material_fee: input.material_fee,
            other_fees: input.other_fees,
            sibling_discounts: input.sibling_discounts,
            apply_sibling_to_all: input.apply_sibling_to_all,
            is_active: true,
            audit: AuditStamp::created(actor, at),
        })
    }

    /// Returns the pricing for a billing frequency.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if this structure does not offer the frequency.
    pub fn pricing_for(&self, frequency: BillingFrequency) -> Result<FrequencyPricing, FeeError> {
        let pricing = match frequency {
            BillingFrequency::Monthly => self.monthly,
            BillingFrequency::Termly => self.termly,
            BillingFrequency::Yearly => self.yearly,
        };
        pricing.ok_or_else(|| {
            FeeError::validation(
                "frequency",
                "not offered by this fee structure",
                frequency,
            )
        })
    }

    /// Returns true if this structure prices the given school, grade and year.
    #[must_use]
    pub fn matches(&self, school_id: SchoolId, grade_level: u8, academic_year: &str) -> bool {
        self.school_id == school_id
            && self.grade_level == grade_level
            && self.academic_year == academic_year
    }
}

/// Input for creating a fee structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFeeStructureInput {
    /// School this structure prices.
    pub school_id: SchoolId,
    /// Grade level.
    pub grade_level: u8,
    /// Academic year label.
    pub academic_year: String,
    /// Monthly pricing, if offered.
    pub monthly: Option<FrequencyPricing>,
    /// Termly pricing, if offered.
    pub termly: Option<FrequencyPricing>,
    /// Yearly pricing, if offered.
    pub yearly: Option<FrequencyPricing>,
    /// Material fee.
    pub material_fee: Money,
    /// Other fees.
    pub other_fees: Money,
    /// Sibling discount rates.
    #[serde(default)]
    pub sibling_discounts: SiblingDiscountTable,
    /// Whether the sibling discount applies to every component.
    #[serde(default)]
    pub apply_sibling_to_all: bool,
}
