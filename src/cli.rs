//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DbOverrides;

/// Blockchain CLI with layered database configuration.
#[derive(Debug, Parser)]
#[command(name = "blockchain-cli", version, about)]
pub struct Cli {
    /// Database type (h2, sqlite, postgresql, mysql)
    #[arg(long, global = true)]
    pub db_type: Option<String>,

    /// Complete database connection URL, used verbatim
    #[arg(long, global = true)]
    pub db_url: Option<String>,

    /// Database host
    #[arg(long, global = true)]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long, global = true)]
    pub db_port: Option<u16>,

    /// Database name
    #[arg(long, global = true)]
    pub db_name: Option<String>,

    /// Database username
    #[arg(long, global = true)]
    pub db_user: Option<String>,

    /// Database password (prefer the DB_PASSWORD environment variable)
    #[arg(long, global = true)]
    pub db_password: Option<String>,

    /// Configuration directory (default: ~/.blockchain-cli)
    #[arg(long, global = true)]
    pub config_dir: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the resolved database configuration
    Status,
    /// Manage persisted CLI options
    Config {
        /// What to do with the configuration
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Export the configuration, including encryption settings, to a file
    Export {
        /// Target file
        path: PathBuf,
    },
    /// Import a configuration from a file and save it
    Import {
        /// Source file
        path: PathBuf,
    },
    /// Delete the saved configuration
    Reset,
    /// List the built-in configuration profiles
    Profiles,
    /// Replace the saved configuration with a built-in profile
    ApplyProfile {
        /// Profile name (development, production, performance, testing)
        name: String,
    },
}

impl Cli {
    /// Collect the database flags into sparse overrides.
    #[must_use]
    pub fn db_overrides(&self) -> DbOverrides {
        DbOverrides {
            db_type: self.db_type.clone(),
            url: self.db_url.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            name: self.db_name.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
        }
    }
}
