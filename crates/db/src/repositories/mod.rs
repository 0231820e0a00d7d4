//! Repository abstractions for billing operations.
//!
//! Repositories read through a [`BillingStore`](crate::store::BillingStore),
//! compute with `tuition-core`, and write back with a conditional commit.
//! Operations that can lose a concurrency race are retried up to
//! `BillingConfig::max_conflict_retries` times, re-reading on every attempt.

pub mod activity_fee;
pub mod bursary;
pub mod fee_structure;
pub mod payment;
pub mod student_fee;

pub use activity_fee::ActivityFeeRepository;
pub use bursary::BursaryRepository;
pub use fee_structure::FeeStructureRepository;
pub use payment::{PaymentRepository, SettledPayment};
pub use student_fee::StudentFeeRepository;
