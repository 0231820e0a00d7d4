//! Activity fee types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tuition_shared::types::{ActivityFeeId, ActivityId, Money, TenantId, UserId};

use crate::audit::AuditStamp;
use crate::error::FeeError;

/// How often an activity is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityFrequency {
    /// Charged once, never prorated.
    OneTime,
    /// Charged monthly.
    Monthly,
    /// Charged per term.
    Termly,
    /// Charged for the whole year.
    Yearly,
}

impl ActivityFrequency {
    /// Returns the string representation of the frequency.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "one_time",
            Self::Monthly => "monthly",
            Self::Termly => "termly",
            Self::Yearly => "yearly",
        }
    }

    /// Parses a frequency from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "one_time" => Some(Self::OneTime),
            "monthly" => Some(Self::Monthly),
            "termly" => Some(Self::Termly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price of one extracurricular activity for one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityFee {
    /// Activity fee ID.
    pub id: ActivityFeeId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The activity this prices.
    pub activity_id: ActivityId,
    /// Display name, copied onto student fee snapshots.
    pub activity_name: String,
    /// Academic year.
    pub academic_year: String,
    /// Full-period amount.
    pub amount: Money,
    /// Billing frequency.
    pub frequency: ActivityFrequency,
    /// Whether late enrollment is prorated.
    pub prorate: bool,
    /// First day of the charged period.
    pub period_start: NaiveDate,
    /// Last day of the charged period (inclusive).
    pub period_end: NaiveDate,
    /// Audit metadata.
    pub audit: AuditStamp,
}

impl ActivityFee {
    /// Builds an activity fee from validated input.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for a blank name, a negative amount, or
    /// a period that ends before it starts.
    pub fn create(
        tenant_id: TenantId,
        input: CreateActivityFeeInput,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<Self, FeeError> {
        if input.activity_name.trim().is_empty() {
            return Err(FeeError::validation("activity_name", "is required", "<empty>"));
        }
        FeeError::check_amount("amount", input.amount)?;
        if input.period_end < input.period_start {
            return Err(FeeError::validation(
                "period_end",
                "must not be before period_start",
                format!("{} < {}", input.period_end, input.period_start),
            ));
        }
        Ok(Self {
            id: ActivityFeeId::new(),
            tenant_id,
            activity_id: input.activity_id,
            activity_name: input.activity_name.trim().to_string(),
            academic_year: input.academic_year,
            amount: input.amount,
            frequency: input.frequency,
            prorate: input.prorate,
            period_start: input.period_start,
            period_end: input.period_end,
            audit: AuditStamp::created(actor, at),
        })
    }

    /// One-time fees and fees with proration switched off are always charged in full.
    #[must_use]
    pub fn is_proration_eligible(&self) -> bool {
        self.prorate && self.frequency != ActivityFrequency::OneTime
    }
}

/// Input for creating an activity fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateActivityFeeInput {
    /// The activity.
    pub activity_id: ActivityId,
    /// Display name.
    pub activity_name: String,
    /// Academic year.
    pub academic_year: String,
    /// Full-period amount.
    pub amount: Money,
    /// Billing frequency.
    pub frequency: ActivityFrequency,
    /// Whether late enrollment is prorated.
    pub prorate: bool,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Last day of the period.
    pub period_end: NaiveDate,
}

/// Outcome of prorating one activity fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProrationResult {
    /// Amount to charge.
    pub charge: Money,
    /// Units in the whole period (1 when not prorated).
    pub units_total: u32,
    /// Units charged.
    pub units_charged: u32,
    /// Per-unit rate, when prorated.
    pub unit_rate: Option<Money>,
    /// Whether the charge is less than the full amount.
    pub prorated: bool,
}

impl ProrationResult {
    pub(crate) fn full(amount: Money, units_total: u32) -> Self {
        Self {
            charge: amount,
            units_total,
            units_charged: units_total,
            unit_rate: None,
            prorated: false,
        }
    }
}
