//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Billing behaviour configuration.
    #[serde(default)]
    pub billing: BillingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Granularity used when prorating activity fees for mid-period enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProrationUnit {
    /// Calendar months anchored at the period start.
    #[default]
    Month,
    /// Seven-day weeks anchored at the period start.
    Week,
}

/// Billing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Prefix printed on receipt numbers, e.g. `RCT` in `RCT-2025-000042`.
    #[serde(default = "default_receipt_prefix")]
    pub receipt_prefix: String,
    /// Proration granularity for activity fees.
    #[serde(default)]
    pub proration_unit: ProrationUnit,
    /// How many times a caller re-runs an operation that lost an optimistic
    /// concurrency race before surfacing the conflict.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Days after generation a student fee falls due when no due date is given.
    #[serde(default = "default_due_days")]
    pub default_due_days: u32,
}

fn default_receipt_prefix() -> String {
    "RCT".to_string()
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_due_days() -> u32 {
    30
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            receipt_prefix: default_receipt_prefix(),
            proration_unit: ProrationUnit::default(),
            max_conflict_retries: default_max_conflict_retries(),
            default_due_days: default_due_days(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TUITION").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
