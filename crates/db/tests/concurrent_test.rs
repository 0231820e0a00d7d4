//! Concurrent access stress tests for billing.
//!
//! These tests verify that:
//! - Racing confirmations of one hold issue exactly one receipt
//! - A bursary never takes more recipients than its capacity
//! - Concurrent payments on one fee leave `total_paid` equal to the sum of
//!   the payments that succeeded

#![allow(clippy::cast_possible_wrap)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{Billing, bursary_input, money, pct, today};
use futures::future::join_all;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;
use tuition_core::FeeError;
use tuition_core::bursary::Coverage;
use tuition_core::fee_structure::BillingFrequency;
use tuition_core::payment::{NewPayment, PaymentIntent, PaymentMethod, PaymentStatus};
use tuition_db::MemoryStore;
use tuition_shared::BillingConfig;
use tuition_shared::types::{Money, StudentId};

fn patient_billing() -> Arc<Billing<MemoryStore>> {
    let config = BillingConfig {
        max_conflict_retries: 50,
        ..BillingConfig::default()
    };
    Arc::new(Billing::with_store(Arc::new(MemoryStore::new()), config))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_confirmations_issue_one_receipt() {
    const RACERS: usize = 8;
    let billing = patient_billing();
    billing.grade_three().await;
    let fee = billing
        .student_fees
        .generate(billing.tenant_id, billing.actor, billing.fee_input(StudentId::new()))
        .await
        .unwrap();
    let held = billing
        .payments
        .record(
            billing.tenant_id,
            billing.actor,
            NewPayment {
                student_fee_id: fee.id,
                amount: money(dec!(1000)),
                method: PaymentMethod::Card,
                payment_date: today(),
                intent: PaymentIntent::Hold,
                external_reference: Some("auth-7781".to_string()),
                notes: None,
            },
        )
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(RACERS));
    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let billing = Arc::clone(&billing);
            let barrier = Arc::clone(&barrier);
            let payment_id = held.payment.id;
            tokio::spawn(async move {
                barrier.wait().await;
                billing
                    .payments
                    .confirm(billing.tenant_id, billing.actor, payment_id)
                    .await
            })
        })
        .collect();

    let results = join_all(handles).await;
    let receipts: HashSet<String> = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .map(|settled| {
            assert_eq!(settled.payment.status, PaymentStatus::Completed);
            settled.payment.receipt_number.unwrap()
        })
        .collect();
    assert_eq!(receipts.len(), 1);

    let stored = billing
        .payments
        .get(billing.tenant_id, held.payment.id)
        .await
        .unwrap();
    assert!(receipts.contains(stored.receipt_number.as_deref().unwrap()));

    let fee = billing
        .student_fees
        .get(billing.tenant_id, fee.id)
        .await
        .unwrap();
    assert_eq!(fee.total_paid, money(dec!(1000)));
    assert_eq!(fee.balance, money(dec!(6200)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bursary_capacity_holds_under_contention() {
    const STUDENTS: usize = 12;
    const PLACES: u32 = 3;
    let billing = patient_billing();
    billing.grade_three().await;
    let bursary = billing
        .bursaries
        .create(
            billing.tenant_id,
            billing.actor,
            bursary_input(Coverage::Percentage(pct(dec!(50))), PLACES),
        )
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(STUDENTS));
    let handles: Vec<_> = (0..STUDENTS)
        .map(|_| {
            let billing = Arc::clone(&billing);
            let barrier = Arc::clone(&barrier);
            let mut input = billing.fee_input(StudentId::new());
            input.bursary_id = Some(bursary.id);
            tokio::spawn(async move {
                barrier.wait().await;
                billing
                    .student_fees
                    .generate(billing.tenant_id, billing.actor, input)
                    .await
            })
        })
        .collect();

    let mut granted = 0;
    for joined in join_all(handles).await {
        match joined.unwrap() {
            Ok(fee) => {
                assert_eq!(fee.bursary_amount, money(dec!(3600)));
                granted += 1;
            }
            Err(err) => assert!(
                matches!(err, FeeError::BursaryFull { .. }),
                "unexpected error: {err}"
            ),
        }
    }
    assert_eq!(granted, PLACES as usize);

    let stored = billing
        .bursaries
        .get(billing.tenant_id, bursary.id)
        .await
        .unwrap();
    assert_eq!(stored.current_recipients, PLACES);
    assert_eq!(stored.remaining_places(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_settle_exactly() {
    const PAYERS: usize = 10;
    let billing = patient_billing();
    billing.grade_three().await;
    let mut input = billing.fee_input(StudentId::new());
    input.frequency = BillingFrequency::Monthly;
    let fee = billing
        .student_fees
        .generate(billing.tenant_id, billing.actor, input)
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(PAYERS));
    let handles: Vec<_> = (0..PAYERS)
        .map(|_| {
            let billing = Arc::clone(&billing);
            let barrier = Arc::clone(&barrier);
            let payment = NewPayment {
                student_fee_id: fee.id,
                amount: money(dec!(80)),
                method: PaymentMethod::MobileMoney,
                payment_date: today(),
                intent: PaymentIntent::Settle,
                external_reference: None,
                notes: None,
            };
            tokio::spawn(async move {
                barrier.wait().await;
                billing
                    .payments
                    .record(billing.tenant_id, billing.actor, payment)
                    .await
            })
        })
        .collect();

    let mut paid = Money::ZERO;
    let mut receipts = HashSet::new();
    for joined in join_all(handles).await {
        match joined.unwrap() {
            Ok(settled) => {
                paid += settled.payment.amount;
                assert!(receipts.insert(settled.payment.receipt_number.unwrap()));
            }
            Err(err) => assert!(err.is_conflict(), "unexpected error: {err}"),
        }
    }

    let stored = billing
        .student_fees
        .get(billing.tenant_id, fee.id)
        .await
        .unwrap();
    assert_eq!(stored.total_paid, paid);
    assert_eq!(stored.balance, money(dec!(800)) - paid);
    assert_eq!(stored.version, 1 + receipts.len() as i64);
}
