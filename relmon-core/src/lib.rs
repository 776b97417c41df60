//! Core building blocks for the relmon service.
//!
//! This crate centralizes everything the server binary wires together:
//! environment-sourced settings, the MySQL pool handle, the bounded
//! readiness gate, the idempotent schema bootstrapper, the fixed-delay
//! periodic scheduler, and the prometheus collectors that observe them.
//! The binary crate owns process concerns only (CLI, logging setup, the
//! scrape endpoint, and signal handling).

pub mod database;
pub mod error;
pub mod metrics;
pub mod readiness;
pub mod reconcile;
pub mod schema;
pub mod scheduler;
pub mod settings;

pub use database::MysqlDatabase;
pub use error::{RelmonError, Result};
pub use metrics::ServiceMetrics;
pub use settings::{ConnectTarget, Settings, SettingsError};
