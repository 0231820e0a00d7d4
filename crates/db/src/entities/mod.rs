//! `SeaORM` entities for the billing tables.

pub mod activity_fees;
pub mod bursaries;
pub mod fee_structures;
pub mod payments;
pub mod student_fees;

/// Convenience re-exports of every entity.
pub mod prelude {
    pub use super::activity_fees::Entity as ActivityFees;
    pub use super::bursaries::Entity as Bursaries;
    pub use super::fee_structures::Entity as FeeStructures;
    pub use super::payments::Entity as Payments;
    pub use super::student_fees::Entity as StudentFees;
}
