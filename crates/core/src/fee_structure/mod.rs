//! Grade-level pricing templates.
//!
//! # Modules
//!
//! - `types` - Fee structure, frequency and pricing types
//! - `resolver` - Active-structure resolution and definition validation

pub mod resolver;
pub mod types;

pub use resolver::{FeeStructureResolver, FeeStructureService};
pub use types::{BillingFrequency, CreateFeeStructureInput, FeeStructure, FrequencyPricing};
