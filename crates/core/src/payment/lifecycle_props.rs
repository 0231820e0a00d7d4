//! Property-based tests for the payment state machine.

use proptest::prelude::*;
use tuition_shared::types::PaymentId;

use crate::error::FeeError;
use crate::payment::lifecycle::PaymentLifecycle;
use crate::payment::types::{PaymentEvent, PaymentStatus};

/// Strategy for generating random PaymentStatus values.
fn arb_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Completed),
        Just(PaymentStatus::Failed),
        Just(PaymentStatus::Cancelled),
        Just(PaymentStatus::Refunded),
    ]
}

/// Strategy for generating random events.
fn arb_event() -> impl Strategy<Value = PaymentEvent> {
    prop_oneof![
        Just(PaymentEvent::Confirm),
        Just(PaymentEvent::Cancel),
        proptest::option::of("[a-z ]{1,20}").prop_map(|reason| PaymentEvent::Fail { reason }),
        "[a-z]{1,20}".prop_map(|reason| PaymentEvent::Refund { reason }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every (status, event) pair either moves to the event's target, is the
    /// single confirm-on-completed no-op, or is rejected naming both ends.
    #[test]
    fn prop_table_is_total(from in arb_status(), event in arb_event()) {
        let id = PaymentId::new();
        match PaymentLifecycle::next(id, from, &event) {
            Ok(Some(to)) => prop_assert_eq!(to, event.target()),
            Ok(None) => {
                prop_assert_eq!(from, PaymentStatus::Completed);
                prop_assert_eq!(event, PaymentEvent::Confirm);
            }
            Err(FeeError::InvalidTransition { payment_id, from: f, to }) => {
                prop_assert_eq!(payment_id, id);
                prop_assert_eq!(f, from);
                prop_assert_eq!(to, event.target());
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// Terminal states reject every event.
    #[test]
    fn prop_terminal_states_reject_everything(from in arb_status(), event in arb_event()) {
        prop_assume!(from.is_terminal());
        prop_assert!(PaymentLifecycle::next(PaymentId::new(), from, &event).is_err());
    }

    /// Nothing ever transitions back to pending.
    #[test]
    fn prop_never_returns_to_pending(from in arb_status(), event in arb_event()) {
        if let Ok(Some(to)) = PaymentLifecycle::next(PaymentId::new(), from, &event) {
            prop_assert_ne!(to, PaymentStatus::Pending);
        }
    }
}
