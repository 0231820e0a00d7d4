//! Persistence for Tuition billing.
//!
//! This crate provides:
//! - The `BillingStore` seam with versioned compare-and-swap commits
//! - An in-memory store and a PostgreSQL store over `SeaORM`
//! - Repositories that read, compute with `tuition-core`, and commit
//! - Database migrations

pub mod entities;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repositories;
pub mod retry;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgBillingStore;
pub use repositories::{
    ActivityFeeRepository, BursaryRepository, FeeStructureRepository, PaymentRepository,
    SettledPayment, StudentFeeRepository,
};
pub use retry::retry_on_conflict;
pub use store::{BillingStore, PaymentCommit, StudentFeeCommit};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tuition_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
