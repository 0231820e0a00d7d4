//! Frequency and sibling discount stacking.
//!
//! # Modules
//!
//! - `calculator` - The pure discount stack

pub mod calculator;

#[cfg(test)]
mod calculator_props;

pub use calculator::{DiscountBreakdown, DiscountCalculator, DiscountInput, SiblingDiscountTable};
