//! Payment domain types.
//!
//! A payment is created either as an authorization hold (`pending`) or as a
//! settled payment (`completed`), and afterwards only moves through the
//! transitions in [`crate::payment::lifecycle::PaymentLifecycle`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tuition_shared::types::{Money, PaymentId, StudentFeeId, TenantId, UserId};

use crate::audit::AuditStamp;

/// Payment status.
///
/// The valid transitions are:
/// - (new) → Pending (hold)
/// - (new) → Completed (settle)
/// - Pending → Completed (confirm)
/// - Pending → Cancelled (cancel)
/// - Pending → Failed (processor decline)
/// - Completed → Refunded (refund, reason required)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Authorized but not yet captured.
    Pending,
    /// Captured and counted toward the fee.
    Completed,
    /// Declined by the processor.
    Failed,
    /// Hold released before confirmation.
    Cancelled,
    /// Money returned to the payer. Terminal.
    Refunded,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Returns true if the amount counts toward the fee's `total_paid`.
    #[must_use]
    pub fn counts_toward_balance(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled | Self::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the payer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at the bursar's office.
    Cash,
    /// Debit or credit card.
    Card,
    /// Direct bank transfer.
    BankTransfer,
    /// Paper cheque.
    Cheque,
    /// Mobile money wallet.
    MobileMoney,
    /// Online payment gateway.
    Online,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::Cheque => "cheque",
            Self::MobileMoney => "mobile_money",
            Self::Online => "online",
        }
    }

    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            "bank_transfer" => Some(Self::BankTransfer),
            "cheque" => Some(Self::Cheque),
            "mobile_money" => Some(Self::MobileMoney),
            "online" => Some(Self::Online),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a new payment is an authorization hold or already settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentIntent {
    /// Create as `pending`; confirmed later by a gateway callback.
    Hold,
    /// Create as `completed` with a receipt, e.g. cash at the counter.
    Settle,
}

/// An event that moves an existing payment between states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaymentEvent {
    /// Capture a held payment.
    Confirm,
    /// Release a held payment.
    Cancel,
    /// Processor declined the held payment.
    Fail {
        /// Decline reason reported by the processor, if any.
        reason: Option<String>,
    },
    /// Return a completed payment.
    Refund {
        /// Why the payment is being refunded.
        reason: String,
    },
}

impl PaymentEvent {
    /// The status this event moves a payment to.
    #[must_use]
    pub fn target(&self) -> PaymentStatus {
        match self {
            Self::Confirm => PaymentStatus::Completed,
            Self::Cancel => PaymentStatus::Cancelled,
            Self::Fail { .. } => PaymentStatus::Failed,
            Self::Refund { .. } => PaymentStatus::Refunded,
        }
    }
}

/// Input for recording a new payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    /// The fee being paid.
    pub student_fee_id: StudentFeeId,
    /// Amount paid. Must be positive.
    pub amount: Money,
    /// How it was paid.
    pub method: PaymentMethod,
    /// When the payer paid.
    pub payment_date: NaiveDate,
    /// Hold or settle.
    pub intent: PaymentIntent,
    /// Gateway or bank reference.
    pub external_reference: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// A payment against one student fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID.
    pub id: PaymentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The fee this payment belongs to.
    pub student_fee_id: StudentFeeId,
    /// Amount paid.
    pub amount: Money,
    /// How it was paid.
    pub method: PaymentMethod,
    /// When the payer paid.
    pub payment_date: NaiveDate,
    /// Current status.
    pub status: PaymentStatus,
    /// Receipt number, issued once on first completion and never changed.
    pub receipt_number: Option<String>,
    /// Gateway or bank reference.
    pub external_reference: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Processor decline reason.
    pub failure_reason: Option<String>,
    /// Refund reason.
    pub refund_reason: Option<String>,
    /// When the payment was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the hold was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// When the payment was refunded.
    pub refunded_at: Option<DateTime<Utc>>,
    /// Audit metadata.
    pub audit: AuditStamp,
}

impl Payment {
    /// Builds a new payment in the given initial status. The receipt is
    /// issued separately once a sequence number is reserved.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        input: NewPayment,
        status: PaymentStatus,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            tenant_id,
            student_fee_id: input.student_fee_id,
            amount: input.amount,
            method: input.method,
            payment_date: input.payment_date,
            status,
            receipt_number: None,
            external_reference: input.external_reference,
            notes: input.notes,
            failure_reason: None,
            refund_reason: None,
            completed_at: (status == PaymentStatus::Completed).then_some(at),
            cancelled_at: None,
            refunded_at: None,
            audit: AuditStamp::created(actor, at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("COMPLETED"), Some(PaymentStatus::Completed));
        assert_eq!(PaymentStatus::parse("settled"), None);
    }

    #[test]
    fn test_only_completed_counts() {
        assert!(PaymentStatus::Completed.counts_toward_balance());
        assert!(!PaymentStatus::Pending.counts_toward_balance());
        assert!(!PaymentStatus::Refunded.counts_toward_balance());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PaymentStatus::Refunded.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Completed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }

    #[test]
    fn test_method_roundtrip() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::Card,
            PaymentMethod::BankTransfer,
            PaymentMethod::Cheque,
            PaymentMethod::MobileMoney,
            PaymentMethod::Online,
        ] {
            assert_eq!(PaymentMethod::parse(method.as_str()), Some(method));
        }
    }

    #[test]
    fn test_event_targets() {
        assert_eq!(PaymentEvent::Confirm.target(), PaymentStatus::Completed);
        assert_eq!(PaymentEvent::Cancel.target(), PaymentStatus::Cancelled);
        assert_eq!(PaymentEvent::Fail { reason: None }.target(), PaymentStatus::Failed);
        assert_eq!(
            PaymentEvent::Refund {
                reason: "duplicate".to_string()
            }
            .target(),
            PaymentStatus::Refunded
        );
    }
}
