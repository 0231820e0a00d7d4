//! Payment lifecycle and fee settlement.
//!
//! # Modules
//!
//! - `types` - Payment, status, method and event types
//! - `lifecycle` - The transition table and receipt issuance
//! - `ledger` - Recomputing a student fee's paid total and balance
//! - `receipt` - Receipt number formatting

pub mod ledger;
pub mod lifecycle;
pub mod receipt;
pub mod types;

#[cfg(test)]
mod lifecycle_props;

pub use ledger::PaymentLedger;
pub use lifecycle::PaymentLifecycle;
pub use receipt::ReceiptNumber;
pub use types::{NewPayment, Payment, PaymentEvent, PaymentIntent, PaymentMethod, PaymentStatus};
