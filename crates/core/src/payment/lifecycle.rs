//! Payment state machine.
//!
//! Every legal move is listed in [`PaymentLifecycle::next`]; anything not
//! listed there is an `InvalidTransition`.

use chrono::{DateTime, Utc};
use tuition_shared::types::{PaymentId, UserId};

use crate::error::FeeError;
use crate::payment::receipt::ReceiptNumber;
use crate::payment::types::{Payment, PaymentEvent, PaymentIntent, PaymentStatus};

/// Stateless payment state machine.
pub struct PaymentLifecycle;

impl PaymentLifecycle {
    /// Status a new payment starts in.
    #[must_use]
    pub fn initial(intent: PaymentIntent) -> PaymentStatus {
        match intent {
            PaymentIntent::Hold => PaymentStatus::Pending,
            PaymentIntent::Settle => PaymentStatus::Completed,
        }
    }

    /// The transition table.
    ///
    /// # Returns
    /// * `Ok(Some(status))` for a state change
    /// * `Ok(None)` when confirming an already completed payment
    /// * `Err(FeeError::InvalidTransition)` for every other combination
    pub fn next(
        payment_id: PaymentId,
        from: PaymentStatus,
        event: &PaymentEvent,
    ) -> Result<Option<PaymentStatus>, FeeError> {
        use PaymentEvent as E;
        use PaymentStatus as S;

        match (from, event) {
            (S::Pending, E::Confirm) => Ok(Some(S::Completed)),
            (S::Pending, E::Cancel) => Ok(Some(S::Cancelled)),
            (S::Pending, E::Fail { .. }) => Ok(Some(S::Failed)),
            (S::Completed, E::Confirm) => Ok(None),
            (S::Completed, E::Refund { .. }) => Ok(Some(S::Refunded)),
            (S::Pending, E::Refund { .. })
            | (S::Completed, E::Cancel | E::Fail { .. })
            | (S::Failed | S::Cancelled | S::Refunded, _) => Err(FeeError::InvalidTransition {
                payment_id,
                from,
                to: event.target(),
            }),
        }
    }

    /// Applies an event to a payment, stamping the matching timestamp and reason.
    ///
    /// Returns `Ok(false)` when the event is a no-op and the payment is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// * `FeeError::Validation` if a refund has a blank reason
    /// * `FeeError::InvalidTransition` if the table does not allow the move
    pub fn apply(
        payment: &mut Payment,
        event: PaymentEvent,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, FeeError> {
        if let PaymentEvent::Refund { reason } = &event
            && reason.trim().is_empty()
        {
            return Err(FeeError::validation(
                "refund_reason",
                "is required",
                "<empty>",
            ));
        }

        let Some(to) = Self::next(payment.id, payment.status, &event)? else {
            return Ok(false);
        };

        match event {
            PaymentEvent::Confirm => payment.completed_at = Some(at),
            PaymentEvent::Cancel => payment.cancelled_at = Some(at),
            PaymentEvent::Fail { reason } => payment.failure_reason = reason,
            PaymentEvent::Refund { reason } => {
                payment.refund_reason = Some(reason.trim().to_string());
                payment.refunded_at = Some(at);
            }
        }
        payment.status = to;
        payment.audit = payment.audit.touched(actor, at);
        Ok(true)
    }

    /// Returns true if the payment is completed but has no receipt yet.
    #[must_use]
    pub fn needs_receipt(payment: &Payment) -> bool {
        payment.status == PaymentStatus::Completed && payment.receipt_number.is_none()
    }

    /// Attaches a receipt number. A payment's receipt is issued exactly once.
    ///
    /// # Errors
    ///
    /// * `FeeError::Validation` if the payment is not completed
    /// * `FeeError::DataIntegrity` if a receipt was already issued
    pub fn issue_receipt(payment: &mut Payment, receipt: ReceiptNumber) -> Result<(), FeeError> {
        if payment.status != PaymentStatus::Completed {
            return Err(FeeError::validation(
                "status",
                "receipt requires a completed payment",
                payment.status,
            ));
        }
        if let Some(existing) = &payment.receipt_number {
            return Err(FeeError::DataIntegrity {
                constraint: "receipt_issued_once",
                detail: format!("payment {} already has receipt {existing}", payment.id),
            });
        }
        payment.receipt_number = Some(receipt.into_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::types::{NewPayment, PaymentMethod};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tuition_shared::types::{Money, StudentFeeId, TenantId};

    fn payment(intent: PaymentIntent) -> Payment {
        Payment::new(
            TenantId::new(),
            NewPayment {
                student_fee_id: StudentFeeId::new(),
                amount: Money::new(dec!(75)),
                method: PaymentMethod::Card,
                payment_date: NaiveDate::from_ymd_opt(2025, 9, 10).unwrap(),
                intent,
                external_reference: Some("gw_123".to_string()),
                notes: None,
            },
            PaymentLifecycle::initial(intent),
            UserId::new(),
            Utc::now(),
        )
    }

    fn receipt(seq: u64) -> ReceiptNumber {
        ReceiptNumber::new("RCT", 2025, seq).unwrap()
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(PaymentLifecycle::initial(PaymentIntent::Hold), PaymentStatus::Pending);
        assert_eq!(PaymentLifecycle::initial(PaymentIntent::Settle), PaymentStatus::Completed);
    }

    #[test]
    fn test_settled_payment_is_stamped_completed() {
        let p = payment(PaymentIntent::Settle);
        assert!(p.completed_at.is_some());
        assert!(PaymentLifecycle::needs_receipt(&p));
    }

    #[test]
    fn test_confirm_pending() {
        let mut p = payment(PaymentIntent::Hold);
        assert!(!PaymentLifecycle::needs_receipt(&p));
        let changed = PaymentLifecycle::apply(&mut p, PaymentEvent::Confirm, UserId::new(), Utc::now()).unwrap();
        assert!(changed);
        assert_eq!(p.status, PaymentStatus::Completed);
        assert!(p.completed_at.is_some());
        assert!(PaymentLifecycle::needs_receipt(&p));
    }

    #[test]
    fn test_reconfirm_is_noop() {
        let mut p = payment(PaymentIntent::Settle);
        PaymentLifecycle::issue_receipt(&mut p, receipt(1)).unwrap();
        let before = p.clone();
        let changed = PaymentLifecycle::apply(&mut p, PaymentEvent::Confirm, UserId::new(), Utc::now()).unwrap();
        assert!(!changed);
        assert_eq!(p, before);
        assert!(!PaymentLifecycle::needs_receipt(&p));
    }

    #[test]
    fn test_cancel_and_fail_from_pending() {
        let mut p = payment(PaymentIntent::Hold);
        PaymentLifecycle::apply(&mut p, PaymentEvent::Cancel, UserId::new(), Utc::now()).unwrap();
        assert_eq!(p.status, PaymentStatus::Cancelled);
        assert!(p.cancelled_at.is_some());

        let mut p = payment(PaymentIntent::Hold);
        let event = PaymentEvent::Fail {
            reason: Some("insufficient funds".to_string()),
        };
        PaymentLifecycle::apply(&mut p, event, UserId::new(), Utc::now()).unwrap();
        assert_eq!(p.status, PaymentStatus::Failed);
        assert_eq!(p.failure_reason.as_deref(), Some("insufficient funds"));
    }

    #[test]
    fn test_refund_requires_reason() {
        let mut p = payment(PaymentIntent::Settle);
        let err = PaymentLifecycle::apply(
            &mut p,
            PaymentEvent::Refund {
                reason: "   ".to_string(),
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FeeError::Validation {
                field: "refund_reason",
                ..
            }
        ));
        assert_eq!(p.status, PaymentStatus::Completed);
    }

    #[test]
    fn test_refund_keeps_receipt() {
        let mut p = payment(PaymentIntent::Settle);
        PaymentLifecycle::issue_receipt(&mut p, receipt(7)).unwrap();
        let event = PaymentEvent::Refund {
            reason: "duplicate charge".to_string(),
        };
        PaymentLifecycle::apply(&mut p, event, UserId::new(), Utc::now()).unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
        assert_eq!(p.refund_reason.as_deref(), Some("duplicate charge"));
        assert_eq!(p.receipt_number.as_deref(), Some("RCT-2025-000007"));
        assert!(p.refunded_at.is_some());
    }

    #[test]
    fn test_refunded_is_terminal() {
        let mut p = payment(PaymentIntent::Settle);
        let refund = PaymentEvent::Refund {
            reason: "duplicate".to_string(),
        };
        PaymentLifecycle::apply(&mut p, refund.clone(), UserId::new(), Utc::now()).unwrap();
        for event in [PaymentEvent::Confirm, PaymentEvent::Cancel, refund] {
            let err = PaymentLifecycle::apply(&mut p, event, UserId::new(), Utc::now()).unwrap_err();
            assert!(matches!(
                err,
                FeeError::InvalidTransition {
                    from: PaymentStatus::Refunded,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_cannot_refund_pending() {
        let mut p = payment(PaymentIntent::Hold);
        let err = PaymentLifecycle::apply(
            &mut p,
            PaymentEvent::Refund {
                reason: "changed mind".to_string(),
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FeeError::InvalidTransition {
                payment_id: p.id,
                from: PaymentStatus::Pending,
                to: PaymentStatus::Refunded,
            }
        );
    }

    #[test]
    fn test_receipt_issued_once() {
        let mut p = payment(PaymentIntent::Settle);
        PaymentLifecycle::issue_receipt(&mut p, receipt(1)).unwrap();
        let err = PaymentLifecycle::issue_receipt(&mut p, receipt(2)).unwrap_err();
        assert!(matches!(err, FeeError::DataIntegrity { .. }));
        assert_eq!(p.receipt_number.as_deref(), Some("RCT-2025-000001"));
    }

    #[test]
    fn test_no_receipt_for_pending() {
        let mut p = payment(PaymentIntent::Hold);
        assert!(PaymentLifecycle::issue_receipt(&mut p, receipt(1)).is_err());
        assert!(p.receipt_number.is_none());
    }
}
