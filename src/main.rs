//! Binary entry point.

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blockchain_cli::cli::{Cli, Commands, ConfigAction};
use blockchain_cli::config::{CliConfig, ConfigManager, ConfigPersistence};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let manager = ConfigManager::global();
    let overrides = cli.db_overrides();
    if !overrides.is_empty() {
        manager.set_cli_arguments(overrides);
    }

    let persistence = match &cli.config_dir {
        Some(dir) => ConfigPersistence::new(dir)
            .with_context(|| format!("invalid config directory {dir:?}"))?,
        None => ConfigPersistence::open_default().context("could not open config directory")?,
    };

    match cli.command {
        Commands::Status => {
            let config = manager.get_config();
            println!("Database type: {}", config.database_type.as_str());
            println!("Database URL:  {}", config.database_url);
            println!("Host:          {}", config.host);
            if let Some(port) = config.port {
                println!("Port:          {port}");
            }
            println!("Name:          {}", config.name);
            println!("User:          {}", config.user);
            println!(
                "Password:      {}",
                if config.password.is_some() { "***" } else { "(none)" }
            );
        }
        Commands::Config { action } => run_config_action(&persistence, action)?,
    }

    Ok(())
}

fn run_config_action(persistence: &ConfigPersistence, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = persistence.load_config().context("could not load configuration")?;
            print!("{}", config.summary());
        }
        ConfigAction::Export { path } => {
            let config = persistence.load_config().context("could not load configuration")?;
            if !persistence
                .export_config(&path, &config)
                .with_context(|| format!("invalid export target {}", path.display()))?
            {
                bail!("export to {} failed", path.display());
            }
            println!("Configuration exported to {}", path.display());
        }
        ConfigAction::Import { path } => {
            match persistence
                .import_config(&path)
                .with_context(|| format!("invalid import source {}", path.display()))?
            {
                Some(config) => {
                    println!("Configuration imported from {}", path.display());
                    print!("{}", config.summary());
                }
                None => bail!("import source {} does not exist", path.display()),
            }
        }
        ConfigAction::Reset => {
            if !persistence.reset_config() {
                bail!("could not remove saved configuration");
            }
            println!("Configuration reset to defaults");
        }
        ConfigAction::Profiles => {
            for name in CliConfig::PROFILES {
                println!("{name}");
            }
        }
        ConfigAction::ApplyProfile { name } => {
            let Some(config) = CliConfig::profile(&name) else {
                bail!(
                    "unknown profile {name:?}; available: {}",
                    CliConfig::PROFILES.join(", ")
                );
            };
            if !persistence.save_config(&config) {
                bail!("could not save configuration");
            }
            println!("Applied profile {name}");
            print!("{}", config.summary());
        }
    }
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
