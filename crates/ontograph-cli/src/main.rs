//! Ontograph CLI - Command line interface for the relation engine

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{analyze, completions, entity, relation, schema};
use config::Config;
use ontograph_core::{OntologySchema, RelationService};
use ontograph_storage::{RedbStorage, StorageBackend};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "ontograph")]
#[command(author, version, about = "Ontology-constrained relations for an instrument catalog")]
pub struct Cli {
    /// Data directory
    #[arg(short, long, global = true, env = "ONTOGRAPH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Ontology schema file (TOML); the built-in catalog is used otherwise
    #[arg(short, long, global = true)]
    pub schema: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the data directory path
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| config.data_dir.clone())
            .unwrap_or_else(config::default_data_dir)
    }

    pub fn schema_path(&self, config: &Config) -> Option<PathBuf> {
        self.schema.clone().or_else(|| config.schema.clone())
    }

    pub fn format(&self, config: &Config) -> OutputFormat {
        self.format.or(config.format).unwrap_or_default()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage catalog entities
    Entity(entity::EntityArgs),
    /// Create, validate and delete relations
    Relation(relation::RelationArgs),
    /// Inspect the ontology schema
    Schema(schema::SchemaArgs),
    /// Graph analytics
    Analyze(analyze::AnalyzeArgs),
    /// Manage CLI configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Load the ontology schema from `path`, or the built-in catalog
pub fn load_schema(path: Option<&Path>) -> anyhow::Result<OntologySchema> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read schema {}", path.display()))?;
            let schema = OntologySchema::from_toml_str(&raw)?;
            tracing::debug!("Loaded {} relation types from {}", schema.len(), path.display());
            Ok(schema)
        }
        None => Ok(OntologySchema::builtin()?),
    }
}

/// Application context with storage backend
pub struct AppContext {
    pub storage: Arc<RedbStorage>,
    pub service: RelationService<RedbStorage>,
    pub format: OutputFormat,
}

impl AppContext {
    pub async fn new(cli: &Cli, config: &Config) -> anyhow::Result<Self> {
        let data_dir = cli.data_dir(config);
        std::fs::create_dir_all(&data_dir)?;

        let db_path = data_dir.join("ontograph.redb");
        tracing::debug!("Using database at: {:?}", db_path);

        let storage = Arc::new(RedbStorage::open(&db_path)?);
        storage.initialize().await?;

        let schema = Arc::new(load_schema(cli.schema_path(config).as_deref())?);
        let service = RelationService::from_backend(storage.clone(), schema)
            .with_options(config.service_options())?;

        Ok(Self {
            storage,
            service,
            format: cli.format(config),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting ontograph CLI");

    // These never touch the database
    match &cli.command {
        Commands::Config(args) => return commands::config::run(args),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let config = Config::load()?;
    let ctx = AppContext::new(&cli, &config).await?;

    match &cli.command {
        Commands::Entity(args) => entity::run(args, &ctx).await?,
        Commands::Relation(args) => relation::run(args, &ctx).await?,
        Commands::Schema(args) => schema::run(args, &ctx)?,
        Commands::Analyze(args) => analyze::run(args, &ctx).await?,
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    Ok(())
}
