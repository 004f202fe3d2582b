//! End-to-end tests across resolution, persistence, and advisories.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use blockchain_cli::config::{
    CliConfig, ConfigManager, ConfigPersistence, DatabaseConfigResolver, DatabaseType, DbOverrides,
    SecurityAdvisor, SharedSink, path,
};

fn manager_in(dir: &TempDir, sink: &SharedSink) -> ConfigManager {
    let manager = ConfigManager::with_properties_path(dir.path().join("database.toml"))
        .with_advisor(SecurityAdvisor::with_sink(Box::new(sink.clone())));
    manager.set_ignore_environment_variables(true);
    manager
}

#[test]
fn test_resolution_walks_cli_env_file_default_chain() {
    let resolver = DatabaseConfigResolver;
    let env: HashMap<String, String> = [("DB_USER".to_string(), "env-user".to_string())].into();
    let file: HashMap<String, String> = [
        ("db.user".to_string(), "file-user".to_string()),
        ("db.host".to_string(), "file-host".to_string()),
    ]
    .into();
    let cli = DbOverrides {
        db_type: Some("postgresql".to_string()),
        ..Default::default()
    };

    let config = resolver.resolve(&cli, &env, &file);

    // Each field walks the chain independently.
    assert_eq!(config.database_type, DatabaseType::Postgresql);
    assert_eq!(config.user, "env-user");
    assert_eq!(config.host, "file-host");
    assert_eq!(config.port, Some(5432));
    assert_eq!(config.database_url, "jdbc:postgresql://file-host:5432/blockchain");
}

#[test]
fn test_manager_scenario_override_warn_clear() {
    let dir = TempDir::new().unwrap();
    let sink = SharedSink::new();
    let manager = manager_in(&dir, &sink);

    assert_eq!(manager.get_config().database_type, DatabaseType::H2);

    manager.set_cli_arguments(DbOverrides {
        db_type: Some("postgresql".to_string()),
        host: Some("db.internal".to_string()),
        password: Some("s3cr3t".to_string()),
        ..Default::default()
    });

    let config = manager.get_config();
    assert_eq!(config.database_type, DatabaseType::Postgresql);
    assert_eq!(config.host, "db.internal");
    assert_eq!(config.password.as_deref(), Some("s3cr3t"));

    let advisories = sink.contents();
    assert!(advisories.contains("command-line"));
    assert!(advisories.contains("DB_PASSWORD"));
    assert!(!advisories.contains("s3cr3t"));

    manager.clear_cli_arguments();
    let config = manager.get_config();
    assert_eq!(config.database_type, DatabaseType::H2);
    assert!(config.password.is_none());
}

#[test]
fn test_cached_config_identity_is_stable_until_invalidation() {
    let dir = TempDir::new().unwrap();
    let sink = SharedSink::new();
    let manager = manager_in(&dir, &sink);

    let first = manager.get_config();
    assert!(Arc::ptr_eq(&first, &manager.get_config()));

    manager.set_cli_arguments(DbOverrides {
        host: Some("elsewhere".to_string()),
        ..Default::default()
    });
    assert!(!Arc::ptr_eq(&first, &manager.get_config()));
}

#[test]
fn test_properties_file_changes_apply_after_reload() {
    let dir = TempDir::new().unwrap();
    let sink = SharedSink::new();
    let manager = manager_in(&dir, &sink);

    assert_eq!(manager.get_config().host, "localhost");

    fs::write(dir.path().join("database.toml"), "db.host = \"replica\"\n").unwrap();
    // Still cached until the reload.
    assert_eq!(manager.get_config().host, "localhost");

    manager.reload();
    assert_eq!(manager.get_config().host, "replica");
}

#[test]
fn test_global_manager_is_one_instance_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| ConfigManager::global() as *const ConfigManager as usize))
        .collect();
    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_persistence_round_trip_preserves_everything() {
    let dir = TempDir::new().unwrap();
    let persistence = ConfigPersistence::new(&dir.path().to_string_lossy()).unwrap();

    let config = CliConfig::builder()
        .output_format("json")
        .unwrap()
        .default_search_type("INTELLIGENT")
        .unwrap()
        .default_search_level("EXHAUSTIVE_OFFCHAIN")
        .unwrap()
        .search_limit(250)
        .unwrap()
        .max_results(2500)
        .command_timeout(60)
        .unwrap()
        .off_chain_threshold(2048)
        .unwrap()
        .log_level("DEBUG")
        .unwrap()
        .verbose_mode(true)
        .store_credentials(true)
        .custom_property("team", "ledger")
        .unwrap()
        .build()
        .unwrap();

    assert!(persistence.save_config(&config));
    assert_eq!(persistence.load_config().unwrap(), config);
}

#[test]
fn test_export_import_round_trip_between_directories() {
    let source_dir = TempDir::new().unwrap();
    let source = ConfigPersistence::new(&source_dir.path().to_string_lossy()).unwrap();

    let config = CliConfig::builder()
        .search_limit(321)
        .unwrap()
        .custom_property("api.token", "do-not-print")
        .unwrap()
        .build()
        .unwrap();

    let exported = source_dir.path().join("shared.toml");
    assert!(source.export_config(&exported, &config).unwrap());

    let dest_dir = TempDir::new().unwrap();
    let dest = ConfigPersistence::new(&dest_dir.path().to_string_lossy()).unwrap();
    let imported = dest.import_config(&exported).unwrap().unwrap();

    assert_eq!(imported.search_limit, 321);
    assert_eq!(imported.custom_property("api.token"), Some("do-not-print"));
    assert_eq!(imported.encryption, config.encryption);
    assert!(dest.config_exists());

    // The summary masks the sensitive custom property.
    assert!(!imported.summary().contains("do-not-print"));
}

#[test]
fn test_malformed_saved_values_degrade_to_defaults() {
    let dir = TempDir::new().unwrap();
    let persistence = ConfigPersistence::new(&dir.path().to_string_lossy()).unwrap();
    fs::write(
        persistence.config_path(),
        concat!(
            "output.format = \"yaml\"\n",
            "search.limit = \"many\"\n",
            "command.timeout = -5\n",
            "enable.metrics = \"definitely\"\n",
            "log.level = \"LOUD\"\n",
        ),
    )
    .unwrap();

    let config = persistence.load_config().unwrap();
    assert_eq!(config, CliConfig::default());
}

#[test]
fn test_path_safety_rules() {
    assert!(path::sanitize_dir("~/config").is_err());
    assert_eq!(path::sanitize_dir("/tmp/../tmp").unwrap(), PathBuf::from("/tmp"));

    let dir = TempDir::new().unwrap();
    let persistence = ConfigPersistence::new(&dir.path().to_string_lossy()).unwrap();
    assert!(persistence.import_config(Path::new("~/anything.toml")).is_err());
    assert!(
        persistence
            .export_config(Path::new("~/anything.toml"), &CliConfig::default())
            .is_err()
    );
}
