//! Activity fees and late-enrollment proration.
//!
//! # Modules
//!
//! - `types` - Activity fee and proration result types
//! - `prorater` - Unit counting and charge computation

pub mod prorater;
pub mod types;

pub use prorater::Prorater;
pub use types::{ActivityFee, ActivityFrequency, CreateActivityFeeInput, ProrationResult};
