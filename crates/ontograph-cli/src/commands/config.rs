//! Config command for managing CLI configuration

use clap::{Args, Subcommand};

use crate::config::{config_file_path, Config};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print a config value
    Get {
        /// Config key name
        key: String,
    },
    /// Set a config value (an empty value clears it)
    Set {
        /// Config key name
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
    /// Write a config file with the effective defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommands::Get { key } => {
            let config = Config::load()?;
            match config.get(key) {
                Some(value) => println!("{}", value),
                None => anyhow::bail!(
                    "Unknown config key: {}. Available keys: {}",
                    key,
                    Config::keys().join(", ")
                ),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::List => {
            let config = Config::load()?;
            println!("Config file: {}", config_file_path().display());
            println!();
            for key in Config::keys() {
                let value = config
                    .get(key)
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "(not set)".to_string());
                println!("{} = {}", key, value);
            }
        }
        ConfigCommands::Path => println!("{}", config_file_path().display()),
        ConfigCommands::Init { force } => init(*force)?,
    }
    Ok(())
}

fn init(force: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let defaults = ontograph_core::ServiceOptions::default();
    let config = Config {
        data_dir: Some(crate::config::default_data_dir()),
        max_depth: Some(defaults.default_max_depth),
        max_paths: Some(defaults.max_paths),
        traversal_timeout_ms: defaults
            .traversal_timeout
            .map(|t| t.as_millis() as u64),
        ..Config::default()
    };
    config.save()?;
    println!("Created config file at {}", path.display());
    Ok(())
}
