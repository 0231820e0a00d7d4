//! Per-student fee aggregation.
//!
//! # Modules
//!
//! - `types` - Student fee snapshot, status and input types
//! - `calculator` - Pricing a student fee from its components

pub mod calculator;
pub mod types;

#[cfg(test)]
mod calculator_props;

pub use calculator::{FeeBreakdown, FeeComponents, StudentFeeCalculator};
pub use types::{
    ActivityCharge, ActivityEnrollment, BursaryChange, FeeStatus, GenerateStudentFeeInput,
    RecalculateStudentFeeInput, StudentFee,
};
