//! Local persistence for CLI options.
//!
//! Configuration lives as TOML under the user's config directory
//! (`~/.blockchain-cli` by default). Loading is lenient: a malformed or
//! partially garbled file degrades field by field to the compiled defaults.
//! Saving restricts the file to owner-only permissions where the platform
//! supports it.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::coerce;
use super::error::ConfigError;
use super::path;
use super::settings::{
    CliConfig, DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_RESULTS, DEFAULT_OFF_CHAIN_THRESHOLD,
    DEFAULT_SEARCH_LIMIT, EncryptionSettings, LogLevel, OutputFormat, SearchLevel, SearchType,
};

const CONFIG_FILE: &str = "config.toml";
const ENCRYPTION_FILE: &str = "encryption.toml";
const CUSTOM_PREFIX: &str = "custom.";

/// Saves, loads, exports, and imports [`CliConfig`] values as TOML files
/// under a sanitized configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigPersistence {
    config_dir: PathBuf,
}

impl ConfigPersistence {
    /// Open persistence rooted at the given directory.
    ///
    /// The path is sanitized and normalized; the directory is created if
    /// missing (failure to create is logged, not fatal, since every later
    /// operation reports its own outcome).
    pub fn new(dir: &str) -> Result<Self, ConfigError> {
        let config_dir = path::sanitize_dir(dir)?;
        if let Err(err) = fs::create_dir_all(&config_dir) {
            warn!("Could not create config directory {:?}: {}", config_dir, err);
        }
        Ok(Self { config_dir })
    }

    /// Open persistence at the default location, `~/.blockchain-cli`.
    pub fn open_default() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::InvalidPath {
            path: "~".to_string(),
            message: "home directory could not be determined".to_string(),
        })?;
        let dir = home.join(super::manager::CONFIG_DIR_NAME);
        if let Err(err) = fs::create_dir_all(&dir) {
            warn!("Could not create config directory {:?}: {}", dir, err);
        }
        Ok(Self { config_dir: dir })
    }

    /// The directory this persistence reads and writes.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the primary configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Whether a saved configuration exists.
    #[must_use]
    pub fn config_exists(&self) -> bool {
        self.config_path().is_file()
    }

    /// Load the saved configuration, or all defaults when none exists.
    ///
    /// Malformed values degrade per field; only a real I/O failure is an
    /// error. Encryption settings load from their own file when present.
    pub fn load_config(&self) -> Result<CliConfig, ConfigError> {
        let mut config = match read_properties(&self.config_path())? {
            Some(props) => config_from_properties(&props),
            None => {
                debug!("No saved configuration at {:?}, using defaults", self.config_path());
                CliConfig::default()
            }
        };
        if let Some(props) = read_properties(&self.config_dir.join(ENCRYPTION_FILE))? {
            config.encryption = encryption_from_properties(&props);
        }
        Ok(config)
    }

    /// Save the configuration, returning whether the write succeeded.
    ///
    /// Encryption settings are written to a separate file so the primary
    /// file can be shared without them.
    pub fn save_config(&self, config: &CliConfig) -> bool {
        if let Err(err) = fs::create_dir_all(&self.config_dir) {
            warn!("Could not create config directory {:?}: {}", self.config_dir, err);
            return false;
        }

        let main = properties_from_config(config, false);
        let encryption = EncryptionDocument {
            encryption: config.encryption.clone(),
        };
        let (main_doc, enc_doc) = match (toml::to_string_pretty(&main), toml::to_string_pretty(&encryption)) {
            (Ok(m), Ok(e)) => (m, e),
            (Err(err), _) | (_, Err(err)) => {
                warn!("Could not serialize configuration: {}", err);
                return false;
            }
        };

        let config_path = self.config_path();
        let encryption_path = self.config_dir.join(ENCRYPTION_FILE);
        for (target, doc) in [(&config_path, main_doc), (&encryption_path, enc_doc)] {
            if let Err(err) = fs::write(target, doc) {
                warn!("Could not write {:?}: {}", target, err);
                return false;
            }
            restrict_permissions(target);
        }
        info!("Configuration saved to {:?}", config_path);
        true
    }

    /// Delete any saved configuration, returning `true` if nothing remains.
    ///
    /// Idempotent: resetting when no file exists succeeds.
    pub fn reset_config(&self) -> bool {
        let mut ok = true;
        for name in [CONFIG_FILE, ENCRYPTION_FILE] {
            let target = self.config_dir.join(name);
            match fs::remove_file(&target) {
                Ok(()) => info!("Removed {:?}", target),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!("Could not remove {:?}: {}", target, err);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Export the configuration, including encryption settings, to an
    /// arbitrary (sanitized) target path.
    pub fn export_config(&self, target: &Path, config: &CliConfig) -> Result<bool, ConfigError> {
        let target = path::sanitize_target(target)?;
        let doc = toml::to_string_pretty(&properties_from_config(config, true))?;
        match fs::write(&target, doc) {
            Ok(()) => {
                restrict_permissions(&target);
                info!("Configuration exported to {:?}", target);
                Ok(true)
            }
            Err(err) => {
                warn!("Could not export configuration to {:?}: {}", target, err);
                Ok(false)
            }
        }
    }

    /// Import a configuration from an arbitrary (sanitized) source path.
    ///
    /// Returns `Ok(None)` when the file does not exist. The imported
    /// configuration is also saved as the current one.
    pub fn import_config(&self, source: &Path) -> Result<Option<CliConfig>, ConfigError> {
        let source = path::sanitize_target(source)?;
        if !source.is_file() {
            warn!("Import source {:?} is not a readable file", source);
            return Ok(None);
        }
        let Some(props) = read_properties(&source)? else {
            return Ok(None);
        };
        let mut config = config_from_properties(&props);
        if props.keys().any(|k| k.starts_with("encryption.")) {
            config.encryption = encryption_from_properties(&props);
        }
        self.save_config(&config);
        info!("Configuration imported from {:?}", source);
        Ok(Some(config))
    }
}

/// Serde wrapper giving encryption settings their own `[encryption]` table.
#[derive(Debug, Serialize, Deserialize)]
struct EncryptionDocument {
    #[serde(default)]
    encryption: EncryptionSettings,
}

/// Read a TOML file as a flat dotted-key property map.
///
/// `Ok(None)` means the file does not exist. A file that exists but fails to
/// parse degrades to an empty map (so every field falls back to its default);
/// any other I/O failure is an error.
pub(crate) fn read_properties(
    target: &Path,
) -> Result<Option<BTreeMap<String, String>>, ConfigError> {
    let text = match fs::read_to_string(target) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: target.to_path_buf(),
                source,
            });
        }
    };
    match text.parse::<toml::Table>() {
        Ok(table) => Ok(Some(coerce::flatten_properties(&table))),
        Err(err) => {
            warn!("Malformed configuration file {:?}: {}", target, err);
            Ok(Some(BTreeMap::new()))
        }
    }
}

/// Build a configuration from a dotted-key property map, degrading each
/// malformed or missing value to its default.
pub(crate) fn config_from_properties(props: &BTreeMap<String, String>) -> CliConfig {
    let defaults = CliConfig::default();
    let get = |key: &str| props.get(key).map(String::as_str);

    let mut config = CliConfig {
        output_format: get("output.format")
            .and_then(OutputFormat::parse)
            .unwrap_or(defaults.output_format),
        default_search_type: get("search.type.default")
            .and_then(SearchType::parse)
            .unwrap_or(defaults.default_search_type),
        default_search_level: get("search.level.default")
            .and_then(SearchLevel::parse)
            .unwrap_or(defaults.default_search_level),
        search_limit: coerce::positive_int_or(get("search.limit"), DEFAULT_SEARCH_LIMIT),
        max_results: coerce::positive_int_or(get("max.results"), DEFAULT_MAX_RESULTS),
        command_timeout: coerce::positive_int_or(get("command.timeout"), DEFAULT_COMMAND_TIMEOUT),
        off_chain_threshold: coerce::positive_long_or(
            get("offchain.threshold"),
            DEFAULT_OFF_CHAIN_THRESHOLD,
        ),
        verbose_mode: coerce::bool_or(get("verbose.mode"), defaults.verbose_mode),
        detailed_output: coerce::bool_or(get("detailed.output"), defaults.detailed_output),
        enable_metrics: coerce::bool_or(get("enable.metrics"), defaults.enable_metrics),
        auto_cleanup: coerce::bool_or(get("auto.cleanup"), defaults.auto_cleanup),
        store_credentials: coerce::bool_or(get("store.credentials"), defaults.store_credentials),
        require_confirmation: coerce::bool_or(
            get("require.confirmation"),
            defaults.require_confirmation,
        ),
        enable_audit_log: coerce::bool_or(get("enable.audit.log"), defaults.enable_audit_log),
        log_level: get("log.level")
            .and_then(LogLevel::parse)
            .unwrap_or(defaults.log_level),
        config_file: get("config.file")
            .filter(|v| path::sanitize_file_name(v).is_ok())
            .map(str::to_string)
            .unwrap_or(defaults.config_file),
        custom_properties: BTreeMap::new(),
        encryption: defaults.encryption,
    };

    // Saved files always satisfy the invariant, but an imported or
    // hand-edited file may not; repair rather than reject.
    if config.max_results < config.search_limit {
        warn!(
            "max.results {} below search.limit {}, raising to match",
            config.max_results, config.search_limit
        );
        config.max_results = config.search_limit;
    }

    for (key, value) in props {
        if let Some(name) = key.strip_prefix(CUSTOM_PREFIX)
            && !name.trim().is_empty()
        {
            config.custom_properties.insert(name.to_string(), value.clone());
        }
    }
    config
}

pub(crate) fn encryption_from_properties(props: &BTreeMap<String, String>) -> EncryptionSettings {
    let defaults = EncryptionSettings::default();
    EncryptionSettings {
        algorithm: props
            .get("encryption.algorithm")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or(defaults.algorithm),
        key_length: coerce::positive_int_or(
            props.get("encryption.key_length").map(String::as_str),
            defaults.key_length,
        ),
        iterations: coerce::positive_int_or(
            props.get("encryption.iterations").map(String::as_str),
            defaults.iterations,
        ),
    }
}

/// Render a configuration as a nested TOML table with dotted keys.
pub(crate) fn properties_from_config(config: &CliConfig, include_encryption: bool) -> toml::Table {
    let mut table = toml::Table::new();
    insert(&mut table, "output.format", config.output_format.as_str().into());
    insert(
        &mut table,
        "search.type.default",
        config.default_search_type.as_str().into(),
    );
    insert(
        &mut table,
        "search.level.default",
        config.default_search_level.as_str().into(),
    );
    insert(&mut table, "search.limit", i64::from(config.search_limit).into());
    insert(&mut table, "max.results", i64::from(config.max_results).into());
    insert(&mut table, "command.timeout", i64::from(config.command_timeout).into());
    insert(
        &mut table,
        "offchain.threshold",
        (config.off_chain_threshold as i64).into(),
    );
    insert(&mut table, "verbose.mode", config.verbose_mode.into());
    insert(&mut table, "detailed.output", config.detailed_output.into());
    insert(&mut table, "enable.metrics", config.enable_metrics.into());
    insert(&mut table, "auto.cleanup", config.auto_cleanup.into());
    insert(&mut table, "store.credentials", config.store_credentials.into());
    insert(
        &mut table,
        "require.confirmation",
        config.require_confirmation.into(),
    );
    insert(&mut table, "enable.audit.log", config.enable_audit_log.into());
    insert(&mut table, "log.level", config.log_level.as_str().into());
    insert(&mut table, "config.file", config.config_file.as_str().into());
    if !config.custom_properties.is_empty() {
        // Literal keys: a custom key may itself contain dots, and splitting
        // it would let "a" and "a.b" clobber each other.
        let mut custom = toml::Table::new();
        for (key, value) in &config.custom_properties {
            custom.insert(key.clone(), value.as_str().into());
        }
        table.insert("custom".to_string(), toml::Value::Table(custom));
    }
    if include_encryption {
        insert(
            &mut table,
            "encryption.algorithm",
            config.encryption.algorithm.as_str().into(),
        );
        insert(
            &mut table,
            "encryption.key_length",
            i64::from(config.encryption.key_length).into(),
        );
        insert(
            &mut table,
            "encryption.iterations",
            i64::from(config.encryption.iterations).into(),
        );
    }
    table
}

/// Insert a value under a dotted key, materializing nested tables.
fn insert(table: &mut toml::Table, dotted: &str, value: toml::Value) {
    match dotted.split_once('.') {
        None => {
            table.insert(dotted.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = table
                .entry(head.to_string())
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            if !entry.is_table() {
                // A scalar already sits on this path segment; replace it.
                *entry = toml::Value::Table(toml::Table::new());
            }
            if let toml::Value::Table(inner) = entry {
                insert(inner, rest, value);
            }
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(target: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = fs::set_permissions(target, fs::Permissions::from_mode(0o600)) {
        warn!("Could not restrict permissions on {:?}: {}", target, err);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_target: &Path) {}
