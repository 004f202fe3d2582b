//! Process-wide database configuration manager.
//!
//! One manager instance serves the whole process via [`ConfigManager::global`];
//! tests build their own instances with explicit constructors. The manager
//! owns the CLI overrides, re-reads environment and file sources on demand,
//! and caches the resolved [`DatabaseConfig`] until something invalidates it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, info};

use super::database::{DatabaseConfig, DatabaseConfigResolver, DbOverrides};
use super::persistence::read_properties;
use super::security::SecurityAdvisor;

/// Properties file holding database connection settings.
pub(crate) const DATABASE_FILE: &str = "database.toml";
/// Name of the per-user configuration directory under the home directory.
pub(crate) const CONFIG_DIR_NAME: &str = ".blockchain-cli";

static GLOBAL: OnceLock<ConfigManager> = OnceLock::new();

#[derive(Debug, Default)]
struct State {
    overrides: DbOverrides,
    ignore_env: bool,
    cached: Option<Arc<DatabaseConfig>>,
}

/// Resolves and caches database configuration from CLI arguments,
/// environment variables, the properties file, and compiled defaults.
pub struct ConfigManager {
    properties_path: Option<PathBuf>,
    resolver: DatabaseConfigResolver,
    advisor: SecurityAdvisor,
    state: Mutex<State>,
}

impl ConfigManager {
    /// The process-wide manager, created on first use.
    pub fn global() -> &'static ConfigManager {
        GLOBAL.get_or_init(ConfigManager::new)
    }

    /// Create a manager reading the default properties file,
    /// `~/.blockchain-cli/database.toml`.
    #[must_use]
    pub fn new() -> Self {
        let properties_path = dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(DATABASE_FILE));
        Self {
            properties_path,
            resolver: DatabaseConfigResolver,
            advisor: SecurityAdvisor::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Create a manager reading a specific properties file. Used by tests
    /// and by explicit `--config-dir` overrides.
    #[must_use]
    pub fn with_properties_path(path: PathBuf) -> Self {
        Self {
            properties_path: Some(path),
            resolver: DatabaseConfigResolver,
            advisor: SecurityAdvisor::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Replace the security advisor. Used by tests to capture advisories.
    #[must_use]
    pub fn with_advisor(mut self, advisor: SecurityAdvisor) -> Self {
        self.advisor = advisor;
        self
    }

    /// The resolved configuration, from cache when nothing changed since the
    /// last call.
    pub fn get_config(&self) -> Arc<DatabaseConfig> {
        let mut state = self.lock_state();
        if let Some(cached) = &state.cached {
            return Arc::clone(cached);
        }
        let resolved = Arc::new(self.resolve(&state));
        state.cached = Some(Arc::clone(&resolved));
        resolved
    }

    /// Install CLI-argument overrides, invalidating the cache.
    ///
    /// A non-empty password override triggers the security advisory here,
    /// exactly once per call, never again at resolution time.
    pub fn set_cli_arguments(&self, overrides: DbOverrides) {
        let warn_password = overrides
            .password
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        {
            let mut state = self.lock_state();
            state.overrides = overrides;
            state.cached = None;
        }
        // Advisory output happens outside the state lock.
        if warn_password {
            self.advisor.warn_cli_password();
        }
        debug!("CLI database overrides installed");
    }

    /// Drop all CLI-argument overrides, invalidating the cache.
    pub fn clear_cli_arguments(&self) {
        let mut state = self.lock_state();
        state.overrides = DbOverrides::default();
        state.cached = None;
    }

    /// Force re-reading environment and file sources on the next
    /// [`ConfigManager::get_config`].
    pub fn reload(&self) {
        let mut state = self.lock_state();
        state.cached = None;
        info!("Database configuration reload requested");
    }

    /// Ignore (or stop ignoring) `DB_*` environment variables. Used by tests
    /// to shield themselves from the ambient environment.
    pub fn set_ignore_environment_variables(&self, ignore: bool) {
        let mut state = self.lock_state();
        state.ignore_env = ignore;
        state.cached = None;
    }

    /// Reset overrides and cache to a pristine state.
    ///
    /// The ignore-environment flag survives on purpose: a test that shielded
    /// itself stays shielded across resets.
    pub fn reset_for_testing(&self) {
        let mut state = self.lock_state();
        state.overrides = DbOverrides::default();
        state.cached = None;
    }

    fn resolve(&self, state: &State) -> DatabaseConfig {
        let env = if state.ignore_env {
            HashMap::new()
        } else {
            self.environment()
        };
        let file = self.file_properties();
        self.resolver.resolve(&state.overrides, &env, &file)
    }

    fn environment(&self) -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("DB_"))
            .collect()
    }

    /// Read the properties file, checking its permissions first.
    ///
    /// Any failure (missing file, unreadable, malformed) degrades to an
    /// empty map so resolution proceeds from the remaining sources.
    fn file_properties(&self) -> HashMap<String, String> {
        let Some(path) = &self.properties_path else {
            return HashMap::new();
        };
        self.check_file_permissions(path);
        let props = match read_properties(path) {
            Ok(Some(props)) => props,
            Ok(None) => return HashMap::new(),
            Err(err) => {
                debug!("Could not read {:?}: {}", path, err);
                return HashMap::new();
            }
        };
        if props
            .get("db.password")
            .is_some_and(|p| !p.trim().is_empty())
        {
            self.advisor.warn_password_in_file(path);
        }
        props.into_iter().collect()
    }

    #[cfg(unix)]
    fn check_file_permissions(&self, path: &std::path::Path) {
        use std::os::unix::fs::MetadataExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.mode();
            if mode & 0o077 != 0 {
                self.advisor.warn_insecure_permissions(path, mode);
            }
        }
    }

    #[cfg(not(unix))]
    fn check_file_permissions(&self, _path: &std::path::Path) {}

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::database::DatabaseType;
    use crate::config::security::SharedSink;
    use std::fs;
    use tempfile::TempDir;

    fn isolated_manager(dir: &TempDir) -> ConfigManager {
        let manager = ConfigManager::with_properties_path(dir.path().join(DATABASE_FILE));
        manager.set_ignore_environment_variables(true);
        manager
    }

    #[test]
    fn test_defaults_without_any_source() {
        let dir = TempDir::new().unwrap();
        let manager = isolated_manager(&dir);

        let config = manager.get_config();
        assert_eq!(config.database_type, DatabaseType::H2);
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn test_cache_returns_same_instance_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let manager = isolated_manager(&dir);

        let first = manager.get_config();
        let second = manager.get_config();
        assert!(Arc::ptr_eq(&first, &second));

        manager.reload();
        let third = manager.get_config();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn test_cli_overrides_invalidate_cache() {
        let dir = TempDir::new().unwrap();
        let manager = isolated_manager(&dir);

        let before = manager.get_config();
        manager.set_cli_arguments(DbOverrides {
            db_type: Some("postgresql".to_string()),
            ..Default::default()
        });
        let after = manager.get_config();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.database_type, DatabaseType::Postgresql);

        manager.clear_cli_arguments();
        assert_eq!(manager.get_config().database_type, DatabaseType::H2);
    }

    #[test]
    fn test_file_properties_feed_resolution() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(DATABASE_FILE),
            "db.type = \"postgresql\"\ndb.host = \"file-host\"\n",
        )
        .unwrap();
        let manager = isolated_manager(&dir);

        let config = manager.get_config();
        assert_eq!(config.database_type, DatabaseType::Postgresql);
        assert_eq!(config.host, "file-host");
    }

    #[test]
    fn test_missing_properties_file_is_fine() {
        let dir = TempDir::new().unwrap();
        let manager = isolated_manager(&dir);
        assert_eq!(manager.get_config().database_type, DatabaseType::H2);
    }

    #[test]
    fn test_cli_password_warns_once_at_install_time() {
        let dir = TempDir::new().unwrap();
        let sink = SharedSink::new();
        let manager = ConfigManager::with_properties_path(dir.path().join(DATABASE_FILE))
            .with_advisor(SecurityAdvisor::with_sink(Box::new(sink.clone())));
        manager.set_ignore_environment_variables(true);

        manager.set_cli_arguments(DbOverrides {
            password: Some("hunter2".to_string()),
            ..Default::default()
        });
        let installs = sink.contents().matches("command-line").count();
        assert!(installs >= 1);

        // Resolving repeatedly adds nothing.
        let before = sink.contents().matches("command-line").count();
        manager.get_config();
        manager.get_config();
        assert_eq!(sink.contents().matches("command-line").count(), before);
        assert!(!sink.contents().contains("hunter2"));
    }

    #[test]
    fn test_empty_password_does_not_warn() {
        let dir = TempDir::new().unwrap();
        let sink = SharedSink::new();
        let manager = ConfigManager::with_properties_path(dir.path().join(DATABASE_FILE))
            .with_advisor(SecurityAdvisor::with_sink(Box::new(sink.clone())));
        manager.set_ignore_environment_variables(true);

        manager.set_cli_arguments(DbOverrides {
            password: Some("   ".to_string()),
            ..Default::default()
        });
        assert!(!sink.contents().contains("command-line"));
    }

    #[test]
    fn test_file_password_triggers_advisory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(DATABASE_FILE),
            "db.password = \"filepass\"\n",
        )
        .unwrap();
        let sink = SharedSink::new();
        let manager = ConfigManager::with_properties_path(dir.path().join(DATABASE_FILE))
            .with_advisor(SecurityAdvisor::with_sink(Box::new(sink.clone())));
        manager.set_ignore_environment_variables(true);

        let config = manager.get_config();
        assert_eq!(config.password.as_deref(), Some("filepass"));
        assert!(sink.contents().contains("configuration file"));
        assert!(!sink.contents().contains("filepass"));
    }

    #[test]
    fn test_reset_for_testing_keeps_env_shield() {
        let dir = TempDir::new().unwrap();
        let manager = isolated_manager(&dir);

        manager.set_cli_arguments(DbOverrides {
            db_type: Some("mysql".to_string()),
            ..Default::default()
        });
        assert_eq!(manager.get_config().database_type, DatabaseType::Mysql);

        manager.reset_for_testing();
        assert_eq!(manager.get_config().database_type, DatabaseType::H2);
        assert!(manager.lock_state().ignore_env);
    }

    #[test]
    fn test_global_returns_one_instance() {
        let first = ConfigManager::global() as *const ConfigManager;
        let second = ConfigManager::global() as *const ConfigManager;
        assert!(std::ptr::eq(first, second));
    }
}
