//! Casehub Engine - case routing and notification service

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use casehub_engine::adapters::TokioScheduler;
use casehub_engine::{Engine, EngineConfig, Seed, Stores};

#[derive(Parser)]
#[command(name = "casehub-engine")]
#[command(about = "Casehub engine - case assignment and notification dispatch", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/casehub/engine.toml)
    #[arg(short, long, global = true, env = "CASEHUB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and keep it running until Ctrl-C
    Run {
        /// JSON seed with companies, accounts and cases to import
        #[arg(short, long)]
        seed: Option<PathBuf>,
        /// PostgreSQL URL, overriding the config file
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { seed, database_url } => cmd_run(cli.config, seed, database_url).await,
        Commands::InitConfig { force } => cmd_init_config(cli.config, force),
        Commands::Config => cmd_config(cli.config),
    }
}

async fn cmd_run(
    config_path: Option<PathBuf>,
    seed: Option<PathBuf>,
    database_url: Option<String>,
) -> Result<()> {
    let mut config = EngineConfig::load(config_path.as_deref())?;
    if database_url.is_some() {
        config.database_url = database_url;
    }

    let stores = match &config.database_url {
        Some(url) => {
            tracing::info!("Using PostgreSQL stores");
            Stores::postgres(url).await?
        }
        None => {
            tracing::warn!("No database_url set - using in-memory stores");
            Stores::in_memory()
        }
    };

    let engine = Engine::build(&config, stores, Arc::new(TokioScheduler::current()))?;
    tracing::info!("Casehub engine initialized");

    if let Some(path) = seed {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read seed from {:?}", path))?;
        engine
            .import_seed(Seed::from_json(&content)?)
            .await
            .context("Failed to import seed")?;
    }

    let summary = engine
        .assign_pending()
        .await
        .context("Automatic assignment failed")?;
    tracing::info!(
        assigned = summary.assigned,
        unassigned = summary.unassigned,
        "Pending cases processed"
    );

    tracing::info!("Running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!(
        pending_timers = engine.dispatcher.pending_timers(),
        "Shutting down"
    );

    Ok(())
}

fn cmd_init_config(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(p) => p,
        None => EngineConfig::config_path()?,
    };
    if path.exists() && !force {
        bail!("Config file {:?} already exists (use --force to overwrite)", path);
    }

    EngineConfig::default().save(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = EngineConfig::load(config_path.as_deref())?;
    let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", rendered);
    Ok(())
}
