//! Property-based tests for the student fee calculator.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tuition_shared::types::{FeeStructureId, Money, Percent, TenantId, UserId};

use super::calculator::{FeeComponents, StudentFeeCalculator};
use crate::bursary::{Bursary, BursaryType, Coverage, CreateBursaryInput};
use crate::discount::SiblingDiscountTable;
use crate::fee_structure::{BillingFrequency, FrequencyPricing};

fn arb_money() -> impl Strategy<Value = Money> {
    (0i64..2_000_000).prop_map(Money::from_cents)
}

fn arb_percent() -> impl Strategy<Value = Percent> {
    (0i64..=10_000).prop_map(|bp| Percent::new(Decimal::new(bp, 2)).unwrap())
}

fn arb_coverage() -> impl Strategy<Value = Option<Coverage>> {
    prop_oneof![
        Just(None),
        arb_percent().prop_map(|p| Some(Coverage::Percentage(p))),
        arb_money().prop_map(|m| Some(Coverage::FixedAmount(m))),
        Just(Some(Coverage::FullTuition)),
    ]
}

prop_compose! {
    fn arb_components()(
        tuition in arb_money(),
        discount in arb_percent(),
        material in arb_money(),
        other in arb_money(),
        second in arb_percent(),
        third in arb_percent(),
        fourth_plus in arb_percent(),
        sibling_order in 1u32..6,
        to_all in any::<bool>(),
    ) -> FeeComponents {
        FeeComponents {
            fee_structure_id: FeeStructureId::new(),
            grade_level: 3,
            frequency: BillingFrequency::Termly,
            pricing: FrequencyPricing { base_amount: tuition, discount_percent: discount },
            material_fee: material,
            other_fees: other,
            activity_charges: Vec::new(),
            sibling_order,
            sibling_table: SiblingDiscountTable { second, third, fourth_plus },
            apply_sibling_to_all: to_all,
        }
    }
}

fn bursary(coverage: Coverage) -> Bursary {
    Bursary::create(
        TenantId::new(),
        CreateBursaryInput {
            name: "Award".to_string(),
            bursary_type: BursaryType::Merit,
            coverage,
            min_grade: 0,
            max_grade: 12,
            academic_year: "2025-2026".to_string(),
            application_deadline: None,
            max_recipients: 1,
        },
        UserId::new(),
        Utc::now(),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// total_due = max(0, before - discounts - bursary), and the bursary never
    /// covers more than was due before it.
    #[test]
    fn prop_total_due_identity(components in arb_components(), coverage in arb_coverage()) {
        let award = coverage.map(bursary);
        let b = StudentFeeCalculator::calculate(&components, award.as_ref()).unwrap();

        let expected = (b.total_before_discounts - b.total_discounts - b.bursary_amount).clamp_zero();
        prop_assert_eq!(b.total_due, expected);
        prop_assert!(!b.total_due.is_negative());
        prop_assert!(b.bursary_amount <= b.pre_bursary_due);
        prop_assert_eq!(b.total_discounts, b.frequency_discount_amount + b.sibling_discount_amount);
        if coverage == Some(Coverage::FullTuition) {
            prop_assert!(b.bursary_amount <= b.base_tuition);
        }
    }

    /// The same inputs always price the same.
    #[test]
    fn prop_deterministic(components in arb_components()) {
        let first = StudentFeeCalculator::calculate(&components, None).unwrap();
        let second = StudentFeeCalculator::calculate(&components, None).unwrap();
        prop_assert_eq!(first, second);
    }
}
