//! Bursary domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tuition_shared::types::{BursaryId, Money, Percent, TenantId, UserId};

use crate::audit::AuditStamp;
use crate::error::FeeError;

/// Why the bursary is awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BursaryType {
    /// Academic merit.
    Merit,
    /// Financial need.
    NeedBased,
    /// Sports scholarship.
    Sports,
    /// Staff children.
    Staff,
    /// Anything else.
    Other,
}

impl BursaryType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merit => "merit",
            Self::NeedBased => "need_based",
            Self::Sports => "sports",
            Self::Staff => "staff",
            Self::Other => "other",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "merit" => Some(Self::Merit),
            "need_based" => Some(Self::NeedBased),
            "sports" => Some(Self::Sports),
            "staff" => Some(Self::Staff),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for BursaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discriminant of [`Coverage`], as stored in the `coverage_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    /// A percentage of the pre-bursary total due.
    Percentage,
    /// A fixed amount.
    FixedAmount,
    /// The whole tuition component.
    FullTuition,
}

impl CoverageType {
    /// Returns the string representation of the coverage type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
            Self::FullTuition => "full_tuition",
        }
    }

    /// Parses a coverage type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "percentage" => Some(Self::Percentage),
            "fixed_amount" => Some(Self::FixedAmount),
            "full_tuition" => Some(Self::FullTuition),
            _ => None,
        }
    }
}

/// How much of the fee a bursary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "coverage_type", content = "coverage_value", rename_all = "snake_case")]
pub enum Coverage {
    /// A percentage of the pre-bursary total due.
    Percentage(Percent),
    /// A fixed amount, capped at the pre-bursary total due.
    FixedAmount(Money),
    /// The base tuition component, capped at the pre-bursary total due.
    FullTuition,
}

impl Coverage {
    /// Rebuilds coverage from its stored type and value.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if a percentage is outside 0..=100 or a
    /// fixed amount is outside `0..=Money::MAX`.
    pub fn from_parts(coverage_type: CoverageType, value: Decimal) -> Result<Self, FeeError> {
        match coverage_type {
            CoverageType::Percentage => Percent::new(value)
                .map(Self::Percentage)
                .map_err(|_| {
                    FeeError::validation(
                        "coverage_value",
                        "percentage must be 0-100 with at most two decimal places",
                        value,
                    )
                }),
            CoverageType::FixedAmount => {
                let amount = Money::new(value);
                FeeError::check_amount("coverage_value", amount)?;
                Ok(Self::FixedAmount(amount))
            }
            CoverageType::FullTuition => Ok(Self::FullTuition),
        }
    }

    /// The discriminant.
    #[must_use]
    pub fn coverage_type(&self) -> CoverageType {
        match self {
            Self::Percentage(_) => CoverageType::Percentage,
            Self::FixedAmount(_) => CoverageType::FixedAmount,
            Self::FullTuition => CoverageType::FullTuition,
        }
    }

    /// The stored value. Full tuition carries no value and stores zero.
    #[must_use]
    pub fn value(&self) -> Decimal {
        match self {
            Self::Percentage(p) => p.value(),
            Self::FixedAmount(m) => m.amount(),
            Self::FullTuition => Decimal::ZERO,
        }
    }
}

/// A bursary with a recipient capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bursary {
    /// Bursary ID.
    pub id: BursaryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Why it is awarded.
    pub bursary_type: BursaryType,
    /// How much it covers.
    pub coverage: Coverage,
    /// Lowest eligible grade (inclusive).
    pub min_grade: u8,
    /// Highest eligible grade (inclusive).
    pub max_grade: u8,
    /// Academic year the bursary applies to.
    pub academic_year: String,
    /// Last day a student can be assigned, if any.
    pub application_deadline: Option<NaiveDate>,
    /// Capacity.
    pub max_recipients: u32,
    /// Students currently holding the bursary.
    pub current_recipients: u32,
    /// Inactive bursaries cannot be assigned.
    pub is_active: bool,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Audit metadata.
    pub audit: AuditStamp,
}

impl Bursary {
    /// Builds an active bursary with no recipients from validated input.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if the definition is invalid.
    pub fn create(
        tenant_id: TenantId,
        input: CreateBursaryInput,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<Self, FeeError> {
        crate::bursary::allocator::BursaryAllocator::validate_definition(&input)?;
        Ok(Self {
            id: BursaryId::new(),
            tenant_id,
            name: input.name.trim().to_string(),
            bursary_type: input.bursary_type,
            coverage: input.coverage,
            min_grade: input.min_grade,
            max_grade: input.max_grade,
            academic_year: input.academic_year.trim().to_string(),
            application_deadline: input.application_deadline,
            max_recipients: input.max_recipients,
            current_recipients: 0,
            is_active: true,
            version: 1,
            audit: AuditStamp::created(actor, at),
        })
    }

    /// Remaining places.
    #[must_use]
    pub fn remaining_places(&self) -> u32 {
        self.max_recipients.saturating_sub(self.current_recipients)
    }
}

/// Input for creating a bursary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBursaryInput {
    /// Display name.
    pub name: String,
    /// Why it is awarded.
    pub bursary_type: BursaryType,
    /// How much it covers.
    pub coverage: Coverage,
    /// Lowest eligible grade.
    pub min_grade: u8,
    /// Highest eligible grade.
    pub max_grade: u8,
    /// Academic year.
    pub academic_year: String,
    /// Application deadline.
    pub application_deadline: Option<NaiveDate>,
    /// Capacity.
    pub max_recipients: u32,
}

/// A change to one bursary's recipient counter, committed atomically with
/// the student fee that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientAdjustment {
    /// One more recipient. Only applies while `current < max`.
    Increment(BursaryId),
    /// One fewer recipient. Only applies while `current > 0`.
    Decrement(BursaryId),
}

impl RecipientAdjustment {
    /// The bursary being adjusted.
    #[must_use]
    pub fn bursary_id(&self) -> BursaryId {
        match self {
            Self::Increment(id) | Self::Decrement(id) => *id,
        }
    }
}
