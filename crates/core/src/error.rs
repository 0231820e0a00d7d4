//! Billing error types.
//!
//! Every variant names the constraint that failed together with the current
//! and attempted values, so callers can report the exact cause.

use std::fmt::Display;

use chrono::NaiveDate;
use thiserror::Error;
use tuition_shared::AppError;
use tuition_shared::types::{BursaryId, Money, PaymentId};

use crate::payment::types::PaymentStatus;

/// Result type alias using `FeeError`.
pub type FeeResult<T> = Result<T, FeeError>;

/// Errors that can occur while pricing, billing, or settling fees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    /// The requested record does not exist for this tenant.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record, e.g. `"fee_structure"`.
        entity: &'static str,
        /// Identifier or lookup key that was used.
        id: String,
    },

    /// Stored data violates a uniqueness invariant.
    #[error("Data integrity violation on {constraint}: {detail}")]
    DataIntegrity {
        /// The invariant that is violated.
        constraint: &'static str,
        /// What was found.
        detail: String,
    },

    /// The student does not meet the bursary's eligibility rules.
    #[error("Bursary {bursary_id} ineligible: {constraint} is {current}, attempted {attempted}")]
    BursaryIneligible {
        /// The bursary being assigned.
        bursary_id: BursaryId,
        /// The eligibility rule that failed.
        constraint: &'static str,
        /// The bursary's value for that rule.
        current: String,
        /// The student's value for that rule.
        attempted: String,
    },

    /// The bursary has no remaining capacity.
    #[error("Bursary {bursary_id} is full: {current} of {max} recipients")]
    BursaryFull {
        /// The bursary being assigned.
        bursary_id: BursaryId,
        /// Current number of recipients.
        current: u32,
        /// Maximum number of recipients.
        max: u32,
    },

    /// The bursary's application deadline has passed.
    #[error("Bursary {bursary_id} expired: deadline {deadline}, attempted on {attempted}")]
    BursaryExpired {
        /// The bursary being assigned.
        bursary_id: BursaryId,
        /// The application deadline.
        deadline: NaiveDate,
        /// The date the assignment was attempted.
        attempted: NaiveDate,
    },

    /// The payment cannot move between these states.
    #[error("Invalid transition for payment {payment_id} from {from} to {to}")]
    InvalidTransition {
        /// The payment being transitioned.
        payment_id: PaymentId,
        /// Its current status.
        from: PaymentStatus,
        /// The attempted target status.
        to: PaymentStatus,
    },

    /// An optimistic concurrency precondition failed. The caller may retry.
    #[error("Concurrent modification of {entity} {id}: expected {expected}, found {actual}")]
    Conflict {
        /// Kind of record that changed underneath the caller.
        entity: &'static str,
        /// Its identifier.
        id: String,
        /// The precondition the caller expected.
        expected: String,
        /// What the store actually held.
        actual: String,
    },

    /// Malformed input: negative amounts, unsupported frequencies, bad dates.
    #[error("Invalid {field}: {constraint} (got {value})")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// The rule it broke.
        constraint: &'static str,
        /// The value that was supplied.
        value: String,
    },

    /// The persistence layer failed.
    #[error("Storage error: {0}")]
    Store(String),
}

impl FeeError {
    /// Builds a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds a `Validation` error.
    pub fn validation(field: &'static str, constraint: &'static str, value: impl Display) -> Self {
        Self::Validation {
            field,
            constraint,
            value: value.to_string(),
        }
    }

    /// Rejects an amount that is negative or larger than `Money::MAX`.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` naming `field`.
    pub fn check_amount(field: &'static str, amount: Money) -> Result<(), Self> {
        if amount.is_negative() {
            return Err(Self::validation(field, "must not be negative", amount));
        }
        if amount > Money::MAX {
            return Err(Self::validation(field, "must not exceed 999999999999.99", amount));
        }
        Ok(())
    }

    /// Builds a `Conflict` error.
    pub fn conflict(
        entity: &'static str,
        id: impl Display,
        expected: impl Display,
        actual: impl Display,
    ) -> Self {
        Self::Conflict {
            entity,
            id: id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Returns true if the operation lost a concurrency race and may be retried.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::InvalidTransition { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::BursaryIneligible { .. }
            | Self::BursaryFull { .. }
            | Self::BursaryExpired { .. } => 422,
            Self::DataIntegrity { .. } | Self::Store(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DataIntegrity { .. } => "DATA_INTEGRITY_ERROR",
            Self::BursaryIneligible { .. } => "BURSARY_INELIGIBLE",
            Self::BursaryFull { .. } => "BURSARY_FULL",
            Self::BursaryExpired { .. } => "BURSARY_EXPIRED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Conflict { .. } => "CONFLICT",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<FeeError> for AppError {
    fn from(err: FeeError) -> Self {
        let message = err.to_string();
        match err {
            FeeError::NotFound { .. } => Self::NotFound(message),
            FeeError::Validation { .. } => Self::Validation(message),
            FeeError::BursaryIneligible { .. }
            | FeeError::BursaryFull { .. }
            | FeeError::BursaryExpired { .. }
            | FeeError::InvalidTransition { .. } => Self::BusinessRule(message),
            FeeError::Conflict { .. } => Self::Conflict(message),
            FeeError::DataIntegrity { .. } => Self::DataIntegrity(message),
            FeeError::Store(_) => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field_and_value() {
        let err = FeeError::validation("amount", "must be positive", "-5.00");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "Invalid amount: must be positive (got -5.00)");
    }

    #[test]
    fn test_check_amount_bounds() {
        assert!(FeeError::check_amount("tuition", Money::ZERO).is_ok());
        assert!(FeeError::check_amount("tuition", Money::MAX).is_ok());
        let err = FeeError::check_amount("tuition", Money::from_cents(-1)).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        let err = FeeError::check_amount("tuition", Money::from_cents(100_000_000_000_000)).unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = FeeError::InvalidTransition {
            payment_id: PaymentId::new(),
            from: PaymentStatus::Refunded,
            to: PaymentStatus::Completed,
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("refunded"));
        assert!(err.to_string().contains("completed"));
    }

    #[test]
    fn test_bursary_errors_are_distinct() {
        let id = BursaryId::new();
        let full = FeeError::BursaryFull {
            bursary_id: id,
            current: 5,
            max: 5,
        };
        let expired = FeeError::BursaryExpired {
            bursary_id: id,
            deadline: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            attempted: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        };
        assert_eq!(full.error_code(), "BURSARY_FULL");
        assert_eq!(expired.error_code(), "BURSARY_EXPIRED");
        assert_eq!(full.status_code(), 422);
        assert!(full.to_string().contains("5 of 5"));
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err = FeeError::conflict("student_fee", "abc", "version 3", "version 4");
        assert!(err.is_conflict());
        assert_eq!(err.status_code(), 409);
        assert!(!FeeError::not_found("payment", "abc").is_conflict());
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = FeeError::conflict("bursary", "b1", "3 < 5", "5").into();
        assert!(app.is_retryable());

        let app: AppError = FeeError::DataIntegrity {
            constraint: "one_active_fee_structure",
            detail: "2 active structures".to_string(),
        }
        .into();
        assert_eq!(app.error_code(), "DATA_INTEGRITY_ERROR");
    }
}
