use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nitter_feed::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "nitter-feed",
    version,
    about = "Streams the latest posts of configured accounts from a rotating pool of Nitter mirrors",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WebSocket feed server
    Serve {
        /// Address to bind, overrides the configuration
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Discover mirrors and print the ones passing a health check
    Instances,

    /// Fetch one timeline page and print it as JSON lines
    Timeline {
        /// Account to fetch
        account: String,

        /// Mirror to use instead of discovering one
        #[arg(short, long)]
        instance: Option<String>,
    },

    /// Poll accounts in the foreground and print new posts as they appear
    Watch {
        /// Accounts to watch, overrides the configuration
        accounts: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("nitter-feed starting");

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(bind = ?bind, "Starting serve command");
            commands::serve(config, bind).await?;
        }

        Commands::Instances => {
            tracing::info!("Starting instances command");
            commands::instances(config).await?;
        }

        Commands::Timeline { account, instance } => {
            tracing::info!(account = %account, instance = ?instance, "Starting timeline command");
            commands::timeline(config, account, instance).await?;
        }

        Commands::Watch { accounts } => {
            tracing::info!(accounts = ?accounts, "Starting watch command");
            commands::watch(config, accounts).await?;
        }
    }

    tracing::info!("nitter-feed completed successfully");
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env().context("Failed to load config from environment")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("nitter_feed=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("nitter_feed={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
