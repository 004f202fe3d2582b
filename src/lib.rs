//! Blockchain CLI configuration subsystem.
//!
//! Provides layered database configuration resolution (CLI arguments,
//! environment variables, properties file, compiled defaults), secure local
//! persistence of CLI options, and security advisories for credentials
//! supplied through unsafe channels.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
