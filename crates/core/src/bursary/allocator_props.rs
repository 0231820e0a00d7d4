//! Property-based tests for the bursary allocator.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tuition_shared::types::{Money, Percent, TenantId, UserId};

use super::allocator::BursaryAllocator;
use super::types::{Bursary, BursaryType, Coverage, CreateBursaryInput};

fn arb_money() -> impl Strategy<Value = Money> {
    (0i64..5_000_000).prop_map(Money::from_cents)
}

fn arb_coverage() -> impl Strategy<Value = Coverage> {
    prop_oneof![
        (0i64..=10_000).prop_map(|bp| Coverage::Percentage(Percent::new(Decimal::new(bp, 2)).unwrap())),
        arb_money().prop_map(Coverage::FixedAmount),
        Just(Coverage::FullTuition),
    ]
}

fn bursary(coverage: Coverage, max_recipients: u32) -> Bursary {
    Bursary::create(
        TenantId::new(),
        CreateBursaryInput {
            name: "Award".to_string(),
            bursary_type: BursaryType::Other,
            coverage,
            min_grade: 0,
            max_grade: 12,
            academic_year: "2025-2026".to_string(),
            application_deadline: None,
            max_recipients,
        },
        UserId::new(),
        Utc::now(),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Coverage never exceeds the pre-bursary due; full tuition never exceeds tuition.
    #[test]
    fn prop_coverage_bounded(coverage in arb_coverage(), due in arb_money(), tuition in arb_money()) {
        let b = bursary(coverage, 1);
        let covered = BursaryAllocator::coverage(&b, due, tuition);
        prop_assert!(covered <= due);
        prop_assert!(!covered.is_negative());
        if coverage == Coverage::FullTuition {
            prop_assert!(covered <= tuition);
        }
    }

    /// Assigning then removing a bursary restores its counter.
    #[test]
    fn prop_assign_then_remove_restores_counter(max in 1u32..50, start_frac in 0u32..100) {
        let mut b = bursary(Coverage::FullTuition, max);
        b.current_recipients = start_frac % max;
        let original = b.current_recipients;
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();

        let assign = BursaryAllocator::plan_change(None, Some(&b), 3, "2025-2026", today).unwrap();
        for adj in assign {
            BursaryAllocator::apply_adjustment(&mut b, adj).unwrap();
        }
        prop_assert_eq!(b.current_recipients, original + 1);

        let snapshot = b.clone();
        let remove = BursaryAllocator::plan_change(Some(&snapshot), None, 3, "2025-2026", today).unwrap();
        for adj in remove {
            BursaryAllocator::apply_adjustment(&mut b, adj).unwrap();
        }
        prop_assert_eq!(b.current_recipients, original);
    }

    /// Applying increments never pushes the counter past capacity.
    #[test]
    fn prop_counter_never_exceeds_max(max in 1u32..20, attempts in 0u32..40) {
        let mut b = bursary(Coverage::FullTuition, max);
        let id = b.id;
        for _ in 0..attempts {
            let _ = BursaryAllocator::apply_adjustment(&mut b, super::types::RecipientAdjustment::Increment(id));
        }
        prop_assert!(b.current_recipients <= b.max_recipients);
        prop_assert_eq!(b.current_recipients, attempts.min(max));
    }
}
