//! Layered configuration resolution and secure local persistence.
//!
//! Database settings resolve per field through a precedence chain:
//! CLI argument > `DB_*` environment variable > properties file > compiled
//! default. CLI option persistence lives beside it under the same
//! per-user directory.
//!
//! Validation runs in two deliberate tiers. Data arriving from files and
//! the environment is coerced leniently, degrading to defaults on malformed
//! input. Programmatic input through [`CliConfigBuilder`] is validated
//! strictly and fails at the offending call.

pub mod coerce;
pub mod database;
pub mod error;
pub mod manager;
pub mod path;
pub mod persistence;
pub mod security;
pub mod settings;

pub use database::{DatabaseConfig, DatabaseConfigResolver, DatabaseType, DbOverrides};
pub use error::ConfigError;
pub use manager::ConfigManager;
pub use persistence::ConfigPersistence;
pub use security::{SecurityAdvisor, SharedSink, is_sensitive_key, mask_value};
pub use settings::{
    CliConfig, CliConfigBuilder, EncryptionSettings, LogLevel, OutputFormat, SearchLevel,
    SearchType,
};
