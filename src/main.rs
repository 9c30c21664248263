//! pagewatch: watch web pages for content changes

mod commands;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use pagewatch::{config::Config, logging::init_logging};
use std::path::PathBuf;
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "pagewatch")]
#[command(about = "Watch web pages for content changes and report them")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every configured URL once (default)
    Run,

    /// Write a sample configuration file and URL list
    Init,

    /// Render charts from recent run reports
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    if let Commands::Init = command {
        commands::init::init_project(&cli.config)?;
        return Ok(());
    }

    // Logging falls back to defaults so a bad config file is still reported
    let loaded = Config::load(&cli.config);
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    let _guard = init_logging(&logging, cli.verbose)?;

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            warn!("Skipping run; fix the configuration or run `pagewatch init`");
            return Ok(());
        }
    };

    let today = Local::now().date_naive();
    match command {
        Commands::Run => {
            commands::run::run_monitoring(&config, today).await?;
        }
        Commands::Report => {
            commands::report::regenerate_charts(&config, today)?;
        }
        Commands::Init => {}
    }

    Ok(())
}
