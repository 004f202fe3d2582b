//! CLI option aggregate and its validating builder.
//!
//! This is the strict validation tier: setters reject bad programmatic input
//! at the offending call with an error naming the valid set or range. The
//! lenient tier for file/environment data lives in `coerce`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::path;
use super::security;

/// Default search result limit.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;
/// Default command timeout in seconds.
pub const DEFAULT_COMMAND_TIMEOUT: u32 = 120;
/// Default maximum number of results.
pub const DEFAULT_MAX_RESULTS: u32 = 1000;
/// Default off-chain storage threshold: 512 KiB.
pub const DEFAULT_OFF_CHAIN_THRESHOLD: u64 = 512 * 1024;
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "blockchain-cli.properties";

/// Minimum off-chain threshold: 1 KiB.
pub const MIN_OFF_CHAIN_THRESHOLD: u64 = 1024;
/// Maximum off-chain threshold: 100 MiB.
pub const MAX_OFF_CHAIN_THRESHOLD: u64 = 100 * 1024 * 1024;

const SEARCH_LIMIT_MIN: u32 = 1;
const SEARCH_LIMIT_MAX: u32 = 10_000;
const COMMAND_TIMEOUT_MIN: u32 = 10;
const COMMAND_TIMEOUT_MAX: u32 = 3600;

/// Output rendering format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text (default).
    #[default]
    Text,
    /// JSON.
    Json,
    /// CSV.
    Csv,
}

impl OutputFormat {
    /// Exact lowercase names accepted by the builder.
    pub const ALLOWED: &'static [&'static str] = &["text", "json", "csv"];

    /// Parse an exact lowercase name; anything else is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// The lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Default search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    /// Plain keyword search (default).
    #[default]
    Simple,
    /// Search restricted to data the caller may decrypt.
    Secure,
    /// Relevance-ranked search.
    Intelligent,
    /// Full query-language search.
    Advanced,
}

impl SearchType {
    /// Exact uppercase names accepted by the builder.
    pub const ALLOWED: &'static [&'static str] = &["SIMPLE", "SECURE", "INTELLIGENT", "ADVANCED"];

    /// Parse an exact uppercase name; anything else is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SIMPLE" => Some(Self::Simple),
            "SECURE" => Some(Self::Secure),
            "INTELLIGENT" => Some(Self::Intelligent),
            "ADVANCED" => Some(Self::Advanced),
            _ => None,
        }
    }

    /// The uppercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::Secure => "SECURE",
            Self::Intelligent => "INTELLIGENT",
            Self::Advanced => "ADVANCED",
        }
    }
}

/// How deep a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchLevel {
    /// Indexed keywords only.
    FastOnly,
    /// Indexed keywords plus on-chain block data (default).
    #[default]
    IncludeData,
    /// Everything, including off-chain storage.
    ExhaustiveOffchain,
}

impl SearchLevel {
    /// Exact names accepted by the builder.
    pub const ALLOWED: &'static [&'static str] =
        &["FAST_ONLY", "INCLUDE_DATA", "EXHAUSTIVE_OFFCHAIN"];

    /// Parse an exact name; anything else is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FAST_ONLY" => Some(Self::FastOnly),
            "INCLUDE_DATA" => Some(Self::IncludeData),
            "EXHAUSTIVE_OFFCHAIN" => Some(Self::ExhaustiveOffchain),
            _ => None,
        }
    }

    /// The canonical name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastOnly => "FAST_ONLY",
            Self::IncludeData => "INCLUDE_DATA",
            Self::ExhaustiveOffchain => "EXHAUSTIVE_OFFCHAIN",
        }
    }
}

/// Log verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Finest-grained messages.
    Trace,
    /// Development diagnostics.
    Debug,
    /// Normal operation (default).
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Exact uppercase names accepted by the builder.
    pub const ALLOWED: &'static [&'static str] = &["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

    /// Parse an exact uppercase name; anything else is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// The uppercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Database-encryption sub-config, persisted alongside the CLI options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionSettings {
    /// Symmetric cipher used for at-rest encryption.
    pub algorithm: String,
    /// Key length in bits.
    pub key_length: u32,
    /// PBKDF2 iteration count for password-derived keys.
    pub iterations: u32,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            algorithm: "AES/GCM/NoPadding".to_string(),
            key_length: 256,
            iterations: 65_536,
        }
    }
}

/// Tool-wide CLI options.
///
/// Constructed with all defaults via [`CliConfig::default`], validated field
/// by field via [`CliConfig::builder`], or loaded leniently by
/// `ConfigPersistence`. Treated as a value object afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Output rendering format.
    pub output_format: OutputFormat,
    /// Default search strategy.
    pub default_search_type: SearchType,
    /// Default search depth.
    pub default_search_level: SearchLevel,
    /// Per-query result limit.
    pub search_limit: u32,
    /// Overall result cap; always `>= search_limit`.
    pub max_results: u32,
    /// Command timeout in seconds.
    pub command_timeout: u32,
    /// Payload size in bytes above which data moves to off-chain storage.
    pub off_chain_threshold: u64,
    /// Verbose progress output.
    pub verbose_mode: bool,
    /// Detailed per-item output.
    pub detailed_output: bool,
    /// Collect search metrics.
    pub enable_metrics: bool,
    /// Remove temporary artifacts automatically.
    pub auto_cleanup: bool,
    /// Persist database credentials locally.
    pub store_credentials: bool,
    /// Prompt before destructive operations.
    pub require_confirmation: bool,
    /// Record an audit log of commands.
    pub enable_audit_log: bool,
    /// Log verbosity threshold.
    pub log_level: LogLevel,
    /// Configuration filename (bare name, no path separators).
    pub config_file: String,
    /// Free-form user properties; keys and values are never empty keys/null.
    pub custom_properties: BTreeMap<String, String>,
    /// Nested database-encryption sub-config.
    pub encryption: EncryptionSettings,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            default_search_type: SearchType::default(),
            default_search_level: SearchLevel::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_results: DEFAULT_MAX_RESULTS,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            off_chain_threshold: DEFAULT_OFF_CHAIN_THRESHOLD,
            verbose_mode: false,
            detailed_output: false,
            enable_metrics: true,
            auto_cleanup: true,
            store_credentials: false,
            require_confirmation: true,
            enable_audit_log: true,
            log_level: LogLevel::default(),
            config_file: DEFAULT_CONFIG_FILE.to_string(),
            custom_properties: BTreeMap::new(),
            encryption: EncryptionSettings::default(),
        }
    }
}

impl CliConfig {
    /// Start building a validated configuration.
    #[must_use]
    pub fn builder() -> CliConfigBuilder {
        CliConfigBuilder::default()
    }

    /// Look up a custom property.
    #[must_use]
    pub fn custom_property(&self, key: &str) -> Option<&str> {
        self.custom_properties.get(key).map(String::as_str)
    }

    /// Names of the built-in profiles, in the order `profile` accepts them.
    pub const PROFILES: &'static [&'static str] =
        &["development", "production", "performance", "testing"];

    /// Look up a built-in profile by name.
    #[must_use]
    pub fn profile(name: &str) -> Option<Self> {
        match name {
            "development" => Some(Self::development()),
            "production" => Some(Self::production()),
            "performance" => Some(Self::performance()),
            "testing" => Some(Self::testing()),
            _ => None,
        }
    }

    /// Preset tuned for development: chatty, no confirmations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            verbose_mode: true,
            detailed_output: true,
            auto_cleanup: false,
            require_confirmation: false,
            log_level: LogLevel::Debug,
            ..Self::default()
        }
    }

    /// Preset tuned for production: quiet, audited, longer timeouts.
    #[must_use]
    pub fn production() -> Self {
        Self {
            command_timeout: 300,
            ..Self::default()
        }
    }

    /// Preset tuned for throughput: larger limits, no metrics.
    #[must_use]
    pub fn performance() -> Self {
        Self {
            search_limit: 100,
            max_results: 2000,
            command_timeout: 60,
            enable_metrics: false,
            ..Self::default()
        }
    }

    /// Preset tuned for tests: minimal overhead, no prompts, no audit log.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            verbose_mode: true,
            enable_metrics: false,
            auto_cleanup: false,
            require_confirmation: false,
            enable_audit_log: false,
            log_level: LogLevel::Warn,
            command_timeout: 30,
            ..Self::default()
        }
    }

    /// A human-readable summary. Sensitive custom properties are masked.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "CLI Configuration Summary:");
        let _ = writeln!(out, "  Output format:       {}", self.output_format.as_str());
        let _ = writeln!(
            out,
            "  Default search:      {} ({})",
            self.default_search_type.as_str(),
            self.default_search_level.as_str()
        );
        let _ = writeln!(out, "  Search limit:        {}", self.search_limit);
        let _ = writeln!(out, "  Max results:         {}", self.max_results);
        let _ = writeln!(out, "  Command timeout:     {} s", self.command_timeout);
        let _ = writeln!(
            out,
            "  Off-chain threshold: {} KB",
            self.off_chain_threshold / 1024
        );
        let _ = writeln!(out, "  Verbose mode:        {}", self.verbose_mode);
        let _ = writeln!(out, "  Detailed output:     {}", self.detailed_output);
        let _ = writeln!(out, "  Metrics:             {}", self.enable_metrics);
        let _ = writeln!(out, "  Auto cleanup:        {}", self.auto_cleanup);
        let _ = writeln!(out, "  Audit log:           {}", self.enable_audit_log);
        let _ = writeln!(out, "  Log level:           {}", self.log_level.as_str());
        if !self.custom_properties.is_empty() {
            let _ = writeln!(out, "  Custom properties:");
            for (key, value) in &self.custom_properties {
                let _ = writeln!(out, "    {key}: {}", security::mask_value(key, value));
            }
        }
        out
    }
}

/// Fluent builder for [`CliConfig`].
///
/// Validating setters fail at the offending call; the cross-field invariant
/// `max_results >= search_limit` is checked only in [`CliConfigBuilder::build`].
#[derive(Debug, Default)]
pub struct CliConfigBuilder {
    config: CliConfig,
}

impl CliConfigBuilder {
    /// Set the output format. Must be exactly one of `text`, `json`, `csv`.
    pub fn output_format(mut self, format: &str) -> Result<Self, ConfigError> {
        match OutputFormat::parse(format) {
            Some(parsed) => {
                self.config.output_format = parsed;
                Ok(self)
            }
            None => Err(ConfigError::Invalid {
                field: "output.format".to_string(),
                message: format!("{:?} is not one of {:?}", format, OutputFormat::ALLOWED),
            }),
        }
    }

    /// Set the default search type. Must be an exact uppercase name.
    pub fn default_search_type(mut self, search_type: &str) -> Result<Self, ConfigError> {
        match SearchType::parse(search_type) {
            Some(parsed) => {
                self.config.default_search_type = parsed;
                Ok(self)
            }
            None => Err(ConfigError::Invalid {
                field: "search.type.default".to_string(),
                message: format!("{:?} is not one of {:?}", search_type, SearchType::ALLOWED),
            }),
        }
    }

    /// Set the default search level. Must be an exact name.
    pub fn default_search_level(mut self, level: &str) -> Result<Self, ConfigError> {
        match SearchLevel::parse(level) {
            Some(parsed) => {
                self.config.default_search_level = parsed;
                Ok(self)
            }
            None => Err(ConfigError::Invalid {
                field: "search.level.default".to_string(),
                message: format!("{:?} is not one of {:?}", level, SearchLevel::ALLOWED),
            }),
        }
    }

    /// Set the log level. Must be an exact uppercase name.
    pub fn log_level(mut self, level: &str) -> Result<Self, ConfigError> {
        match LogLevel::parse(level) {
            Some(parsed) => {
                self.config.log_level = parsed;
                Ok(self)
            }
            None => Err(ConfigError::Invalid {
                field: "log.level".to_string(),
                message: format!("{:?} is not one of {:?}", level, LogLevel::ALLOWED),
            }),
        }
    }

    /// Set the per-query search limit (1..=10000).
    pub fn search_limit(mut self, limit: u32) -> Result<Self, ConfigError> {
        if !(SEARCH_LIMIT_MIN..=SEARCH_LIMIT_MAX).contains(&limit) {
            return Err(ConfigError::Invalid {
                field: "search.limit".to_string(),
                message: format!(
                    "{limit} is outside the range {SEARCH_LIMIT_MIN}..={SEARCH_LIMIT_MAX}"
                ),
            });
        }
        self.config.search_limit = limit;
        Ok(self)
    }

    /// Set the overall result cap. Checked against the search limit in `build`.
    #[must_use]
    pub fn max_results(mut self, max_results: u32) -> Self {
        self.config.max_results = max_results;
        self
    }

    /// Set the command timeout in seconds (10..=3600).
    pub fn command_timeout(mut self, seconds: u32) -> Result<Self, ConfigError> {
        if !(COMMAND_TIMEOUT_MIN..=COMMAND_TIMEOUT_MAX).contains(&seconds) {
            return Err(ConfigError::Invalid {
                field: "command.timeout".to_string(),
                message: format!(
                    "{seconds} is outside the range {COMMAND_TIMEOUT_MIN}..={COMMAND_TIMEOUT_MAX} seconds"
                ),
            });
        }
        self.config.command_timeout = seconds;
        Ok(self)
    }

    /// Set the off-chain threshold in bytes (1 KiB ..= 100 MiB inclusive).
    pub fn off_chain_threshold(mut self, bytes: u64) -> Result<Self, ConfigError> {
        if bytes < MIN_OFF_CHAIN_THRESHOLD {
            return Err(ConfigError::Invalid {
                field: "offchain.threshold".to_string(),
                message: format!(
                    "{bytes} is below the minimum of {MIN_OFF_CHAIN_THRESHOLD} bytes (1KB)"
                ),
            });
        }
        if bytes > MAX_OFF_CHAIN_THRESHOLD {
            return Err(ConfigError::Invalid {
                field: "offchain.threshold".to_string(),
                message: format!(
                    "{bytes} is above the maximum of {MAX_OFF_CHAIN_THRESHOLD} bytes (100MB)"
                ),
            });
        }
        self.config.off_chain_threshold = bytes;
        Ok(self)
    }

    /// Set the configuration filename. Must be a bare name with no
    /// traversal or home-shortcut markers.
    pub fn config_file(mut self, name: &str) -> Result<Self, ConfigError> {
        path::sanitize_file_name(name)?;
        self.config.config_file = name.to_string();
        Ok(self)
    }

    /// Add a custom property. The key must be non-blank; an empty value is
    /// permitted (a valid, if unusual, property value).
    pub fn custom_property(mut self, key: &str, value: &str) -> Result<Self, ConfigError> {
        if key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "custom property".to_string(),
                message: "key cannot be empty".to_string(),
            });
        }
        self.config
            .custom_properties
            .insert(key.to_string(), value.to_string());
        Ok(self)
    }

    /// Enable or disable verbose output.
    #[must_use]
    pub fn verbose_mode(mut self, on: bool) -> Self {
        self.config.verbose_mode = on;
        self
    }

    /// Enable or disable detailed per-item output.
    #[must_use]
    pub fn detailed_output(mut self, on: bool) -> Self {
        self.config.detailed_output = on;
        self
    }

    /// Enable or disable search metrics.
    #[must_use]
    pub fn enable_metrics(mut self, on: bool) -> Self {
        self.config.enable_metrics = on;
        self
    }

    /// Enable or disable automatic cleanup.
    #[must_use]
    pub fn auto_cleanup(mut self, on: bool) -> Self {
        self.config.auto_cleanup = on;
        self
    }

    /// Enable or disable local credential storage.
    #[must_use]
    pub fn store_credentials(mut self, on: bool) -> Self {
        self.config.store_credentials = on;
        self
    }

    /// Enable or disable confirmation prompts.
    #[must_use]
    pub fn require_confirmation(mut self, on: bool) -> Self {
        self.config.require_confirmation = on;
        self
    }

    /// Enable or disable the audit log.
    #[must_use]
    pub fn enable_audit_log(mut self, on: bool) -> Self {
        self.config.enable_audit_log = on;
        self
    }

    /// Replace the encryption sub-config.
    #[must_use]
    pub fn encryption(mut self, settings: EncryptionSettings) -> Self {
        self.config.encryption = settings;
        self
    }

    /// Finish building, checking the cross-field invariant
    /// `max_results >= search_limit`.
    pub fn build(self) -> Result<CliConfig, ConfigError> {
        if self.config.max_results < self.config.search_limit {
            return Err(ConfigError::Invalid {
                field: "max.results".to_string(),
                message: format!(
                    "max.results ({}) must be >= search.limit ({})",
                    self.config.max_results, self.config.search_limit
                ),
            });
        }
        Ok(self.config)
    }
}
