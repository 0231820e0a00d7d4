//! Property-based tests for the discount calculator.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tuition_shared::types::{Money, Percent};

use super::calculator::{DiscountCalculator, DiscountInput, SiblingDiscountTable};

fn arb_money() -> impl Strategy<Value = Money> {
    (0i64..10_000_000).prop_map(Money::from_cents)
}

fn arb_percent() -> impl Strategy<Value = Percent> {
    (0i64..=10_000).prop_map(|bp| Percent::new(Decimal::new(bp, 2)).unwrap())
}

fn arb_table() -> impl Strategy<Value = SiblingDiscountTable> {
    (arb_percent(), arb_percent(), arb_percent()).prop_map(|(second, third, fourth_plus)| {
        SiblingDiscountTable {
            second,
            third,
            fourth_plus,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The frequency-discounted tuition is round(b × (1 − d/100), 2) and never exceeds b.
    #[test]
    fn prop_frequency_discount_bounded(tuition in arb_money(), d in arb_percent()) {
        let input = DiscountInput {
            tuition,
            activity_fees: Money::ZERO,
            material_fees: Money::ZERO,
            other_fees: Money::ZERO,
            frequency_discount: d,
            sibling_order: 1,
            sibling_table: SiblingDiscountTable::default(),
            apply_sibling_to_all: false,
        };
        let result = DiscountCalculator::compute(&input).unwrap();
        let expected = Money::new(
            tuition.amount() * (Decimal::ONE_HUNDRED - d.value()) / Decimal::ONE_HUNDRED,
        );
        prop_assert_eq!(result.tuition_after_frequency, expected);
        prop_assert!(result.tuition_after_frequency <= tuition);
        prop_assert_eq!(result.frequency_discount_amount + result.tuition_after_frequency, tuition);
    }

    /// Sibling order four and above always uses the "fourth and beyond" rate.
    #[test]
    fn prop_fourth_plus_collapses(order in 4u32.., table in arb_table()) {
        prop_assert_eq!(table.rate_for(order).unwrap(), table.fourth_plus);
    }

    /// Discounts never exceed the amount they are taken from.
    #[test]
    fn prop_discounts_never_exceed_base(
        tuition in arb_money(),
        activity in arb_money(),
        material in arb_money(),
        other in arb_money(),
        d in arb_percent(),
        order in 1u32..8,
        table in arb_table(),
        to_all in any::<bool>(),
    ) {
        let input = DiscountInput {
            tuition,
            activity_fees: activity,
            material_fees: material,
            other_fees: other,
            frequency_discount: d,
            sibling_order: order,
            sibling_table: table,
            apply_sibling_to_all: to_all,
        };
        let result = DiscountCalculator::compute(&input).unwrap();
        prop_assert!(result.sibling_discount_amount <= result.sibling_discount_base);
        prop_assert!(!result.frequency_discount_amount.is_negative());
        prop_assert!(!result.sibling_discount_amount.is_negative());
        if !to_all {
            prop_assert!(result.total() <= tuition);
        }
    }
}
