//! Database connection settings and the source-resolution chain.
//!
//! Every connection field independently walks the chain
//! CLI argument > environment variable > properties file > compiled default.
//! Resolution never fails on malformed input: an unknown dialect or a
//! garbled port degrades to the default and the tool keeps working.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::coerce;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_NAME: &str = "blockchain";
const DEFAULT_USER: &str = "blockchain_user";
const DEFAULT_SQLITE_FILE: &str = "blockchain.db";

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseType {
    /// Embedded H2 database (default, no server required).
    #[default]
    H2,
    /// SQLite file database.
    Sqlite,
    /// PostgreSQL server.
    Postgresql,
    /// MySQL server.
    Mysql,
}

impl DatabaseType {
    /// Parse a dialect name.
    ///
    /// Matching is case-sensitive against the lowercase names; anything else
    /// is `None` and callers fall back to [`DatabaseType::H2`].
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "h2" => Some(Self::H2),
            "sqlite" => Some(Self::Sqlite),
            "postgresql" => Some(Self::Postgresql),
            "mysql" => Some(Self::Mysql),
            _ => None,
        }
    }

    /// The lowercase dialect name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H2 => "h2",
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
        }
    }

    /// Default TCP port, for server-based dialects.
    #[must_use]
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgresql => Some(5432),
            Self::Mysql => Some(3306),
            Self::H2 | Self::Sqlite => None,
        }
    }
}

/// Sparse CLI-argument overrides.
///
/// Any unset field falls through to the next configuration source.
#[derive(Debug, Clone, Default)]
pub struct DbOverrides {
    /// Database type override (`--db-type`).
    pub db_type: Option<String>,
    /// Complete connection URL override (`--db-url`), used verbatim.
    pub url: Option<String>,
    /// Host override (`--db-host`).
    pub host: Option<String>,
    /// Port override (`--db-port`).
    pub port: Option<u16>,
    /// Database name override (`--db-name`).
    pub name: Option<String>,
    /// Username override (`--db-user`).
    pub user: Option<String>,
    /// Password override (`--db-password`). Triggers a security advisory.
    pub password: Option<String>,
}

impl DbOverrides {
    /// True when no override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.db_type.is_none()
            && self.url.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.name.is_none()
            && self.user.is_none()
            && self.password.is_none()
    }
}

/// Resolved, immutable database connection settings.
///
/// A new instance replaces the cached one on reload; nothing mutates an
/// existing instance after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The resolved dialect.
    pub database_type: DatabaseType,
    /// Connection URL, either verbatim from a source or synthesized per
    /// dialect. Never empty.
    pub database_url: String,
    /// Server host (meaningful for server-based dialects).
    pub host: String,
    /// Server port, when the dialect uses one.
    pub port: Option<u16>,
    /// Database name (or file name for embedded dialects).
    pub name: String,
    /// Username.
    pub user: String,
    /// Password, when one was supplied by any source. Never logged.
    pub password: Option<String>,
}

/// Merges CLI overrides, environment variables, file properties, and
/// compiled defaults into one [`DatabaseConfig`].
#[derive(Debug, Default)]
pub struct DatabaseConfigResolver;

impl DatabaseConfigResolver {
    /// Resolve a configuration from the four sources.
    ///
    /// `env` holds environment variables (`DB_TYPE`, `DB_HOST`, ...); `file`
    /// holds the dotted-key view of the properties file (`db.type`,
    /// `db.host`, ...). Empty strings count as absent.
    #[must_use]
    pub fn resolve(
        &self,
        cli: &DbOverrides,
        env: &HashMap<String, String>,
        file: &HashMap<String, String>,
    ) -> DatabaseConfig {
        let database_type = match pick(cli.db_type.as_deref(), env, "DB_TYPE", file, "db.type") {
            Some(raw) => DatabaseType::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown database type {:?}, falling back to h2", raw);
                DatabaseType::H2
            }),
            None => DatabaseType::H2,
        };

        let host = pick(cli.host.as_deref(), env, "DB_HOST", file, "db.host")
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port_raw = cli
            .port
            .map(|p| p.to_string())
            .or_else(|| pick(None, env, "DB_PORT", file, "db.port"));
        let port = match database_type.default_port() {
            Some(default) => Some(coerce::port_or(port_raw.as_deref(), default)),
            None => port_raw.as_deref().and_then(|s| s.trim().parse().ok()),
        };

        let name = pick(cli.name.as_deref(), env, "DB_NAME", file, "db.name")
            .unwrap_or_else(|| default_name(database_type));
        let user = pick(cli.user.as_deref(), env, "DB_USER", file, "db.user")
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        let password = pick(cli.password.as_deref(), env, "DB_PASSWORD", file, "db.password");

        // A complete URL from any source wins verbatim over host/port/name.
        let database_url = match pick(cli.url.as_deref(), env, "DB_URL", file, "db.url") {
            Some(url) => url,
            None => synthesize_url(database_type, &host, port, &name),
        };

        debug!(
            "Database configuration resolved: type={}",
            database_type.as_str()
        );

        DatabaseConfig {
            database_type,
            database_url,
            host,
            port,
            name,
            user,
            password,
        }
    }
}

fn default_name(database_type: DatabaseType) -> String {
    match database_type {
        DatabaseType::Sqlite => DEFAULT_SQLITE_FILE.to_string(),
        _ => DEFAULT_NAME.to_string(),
    }
}

fn synthesize_url(
    database_type: DatabaseType,
    host: &str,
    port: Option<u16>,
    name: &str,
) -> String {
    match database_type {
        DatabaseType::Postgresql => {
            format!("jdbc:postgresql://{host}:{}/{name}", port.unwrap_or(5432))
        }
        DatabaseType::Mysql => {
            format!("jdbc:mysql://{host}:{}/{name}", port.unwrap_or(3306))
        }
        DatabaseType::Sqlite => format!("jdbc:sqlite:{name}"),
        DatabaseType::H2 => format!("jdbc:h2:./{name}"),
    }
}

/// First non-empty value walking CLI > environment > file.
fn pick(
    cli: Option<&str>,
    env: &HashMap<String, String>,
    env_key: &str,
    file: &HashMap<String, String>,
    file_key: &str,
) -> Option<String> {
    non_empty(cli)
        .or_else(|| non_empty(env.get(env_key).map(String::as_str)))
        .or_else(|| non_empty(file.get(file_key).map(String::as_str)))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
