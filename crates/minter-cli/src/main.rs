use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod config;
mod env_vars;
mod setup;
mod sub_commands;

/// Mint from a limited-supply collection through a wallet
#[derive(Parser)]
#[command(name = "minter-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Logging level
    #[arg(short, long, default_value = "error")]
    log_level: Level,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what the user would see
    Status,
    /// Ask the wallet for account access
    Connect,
    /// Minted and remaining supply
    Count,
    /// Mint items
    Mint(sub_commands::mint::MintSubCommand),
    /// Follow the remaining supply until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();
    let default_filter = args.log_level;

    let hyper_filter = "hyper=warn,reqwest=warn";

    let env_filter = EnvFilter::new(format!("{},{}", default_filter, hyper_filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = config::Settings::new(args.config.as_ref())?.from_env()?;
    tracing::debug!("Using settings {:?}", settings);

    let dapp = setup::dapp(&settings)?;

    match &args.command {
        Commands::Status => sub_commands::status::status(&dapp).await,
        Commands::Connect => sub_commands::connect::connect(&dapp).await,
        Commands::Count => sub_commands::count::count(&dapp).await,
        Commands::Mint(sub_command_args) => {
            sub_commands::mint::mint(&dapp, sub_command_args).await
        }
        Commands::Watch => sub_commands::watch::watch(&dapp).await,
    }
}
