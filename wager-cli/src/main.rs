mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::CliConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wager_core::{Storage, WagerError};

#[derive(Parser)]
#[command(name = "wager")]
#[command(about = "Two-party wager exchange with arbiter settlement")]
#[command(version)]
struct Cli {
    /// Data directory for the exchange database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Identity making the call
    #[arg(long = "as", global = true, value_name = "IDENTITY")]
    caller: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new exchange database
    Init {
        /// Owner identity
        #[arg(long)]
        owner: String,
        /// Default arbiter (defaults to the owner)
        #[arg(long)]
        arbiter: Option<String>,
        /// Emergency arbiter (defaults to the owner)
        #[arg(long)]
        emergency: Option<String>,
    },
    /// Credit an account on the ledger
    Deposit { who: String, amount: u64 },
    /// Debit an account on the ledger
    Withdraw { who: String, amount: u64 },
    /// Show an account balance
    Balance { who: String },
    /// Propose a wager, staking the given amount
    Create {
        stake: u64,
        /// Arbiter for this wager (defaults to the exchange default)
        #[arg(long)]
        arbiter: Option<String>,
    },
    /// Accept a listed wager, matching its stake
    Accept { id: String },
    /// Declare the winner of an active wager
    Settle { id: String, winner: String },
    /// Cancel a listed wager and refund the stake
    Cancel { id: String },
    /// Hand a listed wager to a different arbiter
    Reassign { id: String, arbiter: String },
    /// Show one wager
    Show { id: String },
    /// List wagers waiting for a counterparty
    Open,
    /// List the caller's wagers
    Mine {
        /// open, active, won, lost or canceled
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show the notification log
    History {
        /// Only this wager
        #[arg(short, long)]
        wager: Option<String>,
        /// Only entries after this sequence number
        #[arg(short, long, default_value_t = 0)]
        since: u64,
    },
    /// Exchange configuration
    #[command(subcommand)]
    Config(commands::ConfigCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::new(cli.data_dir, cli.verbose);

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Ensure data directory exists
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    let storage = Storage::new(&config.db_path())
        .await
        .with_context(|| format!("opening {}", config.db_path().display()))?;
    let caller = cli.caller.as_deref();
    tracing::debug!("Using database {}", config.db_path().display());

    // Execute command
    let result = match cli.command {
        Commands::Init {
            owner,
            arbiter,
            emergency,
        } => commands::init(&storage, &owner, arbiter.as_deref(), emergency.as_deref()).await,
        Commands::Deposit { who, amount } => commands::deposit(&storage, &who, amount).await,
        Commands::Withdraw { who, amount } => commands::withdraw(&storage, &who, amount).await,
        Commands::Balance { who } => commands::show_balance(&storage, &who).await,
        Commands::Create { stake, arbiter } => {
            commands::create_wager(&storage, caller, stake, arbiter.as_deref()).await
        }
        Commands::Accept { id } => commands::accept_wager(&storage, caller, &id).await,
        Commands::Settle { id, winner } => {
            commands::settle_wager(&storage, caller, &id, &winner).await
        }
        Commands::Cancel { id } => commands::cancel_wager(&storage, caller, &id).await,
        Commands::Reassign { id, arbiter } => {
            commands::reassign_arbiter(&storage, caller, &id, &arbiter).await
        }
        Commands::Show { id } => commands::show_wager(&storage, &id).await,
        Commands::Open => commands::list_open(&storage).await,
        Commands::Mine { category } => {
            commands::list_mine(&storage, caller, category.as_deref()).await
        }
        Commands::History { wager, since } => {
            commands::show_history(&storage, wager.as_deref(), since).await
        }
        Commands::Config(cmd) => commands::handle_config_command(cmd, &storage, caller).await,
    };

    if let Err(e) = result {
        match &e {
            WagerError::InsufficientFunds { need, available } => {
                eprintln!("Error: Insufficient funds");
                eprintln!("Need: {}, Available: {}", need, available);
                eprintln!("Use 'wager deposit <who> <amount>' to fund the account");
            }
            WagerError::NotFound(id) => {
                eprintln!("Error: Wager {} not found", id);
                eprintln!("Use 'wager open' to see listed wagers");
            }
            WagerError::Unauthorized { .. } => {
                eprintln!("Error: {}", e);
                eprintln!("Pass the acting identity with '--as <identity>'");
            }
            _ => {
                eprintln!("Error [{}]: {}", e.kind(), e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
