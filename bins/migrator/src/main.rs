//! Database migration runner for Tuition billing.
//!
//! Usage:
//!   migrator up      - Apply the billing schema
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-apply
//!
//! Reads `DATABASE_URL`, from the environment or a `.env` file.

use sea_orm_migration::prelude::*;
use tuition_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // run_cli installs its own subscriber
    cli::run_cli(Migrator).await;
}
