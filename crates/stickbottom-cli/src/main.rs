use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stickbottom_core::Config;

mod commands;
mod scenario;

#[derive(Parser)]
#[command(name = "stickbottom")]
#[command(author, version, about = "Replay scroll scenarios against the stick-to-bottom engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ~/.config/stickbottom/config.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file over virtual time and print a frame trace
    Replay {
        /// Scenario TOML file
        scenario: PathBuf,
        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,
        /// Pace frames in real time
        #[arg(long)]
        realtime: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write the configuration file instead of printing it
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    // Initialize logging; stdout carries the trace
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Replay {
            scenario,
            json,
            realtime,
        } => commands::replay::run(&config, &scenario, json, realtime).await,
        Commands::Config { init } => commands::config::run(&config, cli.config.as_deref(), init),
    }
}
