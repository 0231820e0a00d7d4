//! Shared types, errors, and configuration for Tuition.
//!
//! This crate provides common types used across all other crates:
//! - Money and percentage types with fixed two-place precision
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, BillingConfig, ProrationUnit};
pub use error::{AppError, AppResult};
