//! Bursaries: eligibility, coverage and recipient capacity.
//!
//! # Modules
//!
//! - `types` - Bursary, coverage and counter adjustment types
//! - `allocator` - Eligibility checks, coverage and counter planning

pub mod allocator;
pub mod types;

#[cfg(test)]
mod allocator_props;

pub use allocator::BursaryAllocator;
pub use types::{Bursary, BursaryType, Coverage, CoverageType, CreateBursaryInput, RecipientAdjustment};
