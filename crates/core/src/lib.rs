//! Core billing logic for Tuition.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and fee calculations live here.
//!
//! # Modules
//!
//! - `fee_structure` - Grade/year pricing templates and their resolution
//! - `discount` - Frequency and sibling discount stacking
//! - `bursary` - Bursary eligibility, capacity and coverage
//! - `proration` - Activity fee proration for mid-period enrollment
//! - `student_fee` - Student fee aggregation and snapshots
//! - `payment` - Payment lifecycle state machine and balance settlement
//!
//! Discounts always stack in the same order: frequency, then sibling, then bursary.

pub mod audit;
pub mod bursary;
pub mod discount;
pub mod error;
pub mod fee_structure;
pub mod payment;
pub mod proration;
pub mod student_fee;

pub use audit::AuditStamp;
pub use error::{FeeError, FeeResult};
