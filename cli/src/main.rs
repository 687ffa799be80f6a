use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claimpilot_engine::{ControlEditor, FileStore, PayoutRepository};

mod commands;
mod config;
mod error;

use commands::handlers;
use config::load_config;

#[derive(Parser)]
#[command(name = "claimpilot")]
#[command(about = "Operator CLI for payout cycle administration")]
struct Cli {
    /// Path to the CLI configuration file
    #[arg(long, default_value = "claimpilot.toml")]
    config: String,

    /// Path to the payout store file (overrides the configuration)
    #[arg(long, env = "STORE_PATH")]
    store: Option<String>,

    /// The administrative command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display a wallet's live payout status and recorded tokens
    Status {
        /// The wallet address to inspect
        wallet: String,
        /// Emit the status as JSON for machine consumption
        #[arg(long)]
        json: bool,
    },
    /// List every wallet carrying an admin override
    List,
    /// Freeze a wallet's payout countdown
    Pause {
        /// The wallet address to pause
        wallet: String,
    },
    /// Unfreeze a wallet's payout countdown where it left off
    Resume {
        /// The wallet address to resume
        wallet: String,
    },
    /// Shift a wallet's payout timing by a number of minutes (negative
    /// values move it earlier)
    Shift {
        /// The wallet address to retime
        wallet: String,
        /// Minutes to add to the authoritative anchor (e.g. 30 or -5)
        #[arg(long, allow_hyphen_values = true)]
        minutes: i64,
    },
    /// Set the next payout to an absolute local timestamp
    SetTime {
        /// The wallet address to retime
        wallet: String,
        /// Local timestamp, e.g. "2026-08-07 18:30" or RFC 3339
        timestamp: String,
    },
    /// Convert a wallet to a recurring payout cycle
    StartCycle {
        /// The wallet address to convert
        wallet: String,
        /// Cycle length in hours (defaults to the configured cycle)
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Clear a wallet's admin override entirely
    Reset {
        /// The wallet address to reset
        wallet: String,
    },
    /// Follow a wallet's countdown live
    Watch {
        /// The wallet address to watch
        wallet: String,
        /// Recompute interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claimpilot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let store_path = cli.store.unwrap_or(config.store_path);

    let store = Arc::new(FileStore::open(&store_path)?);
    let repo = PayoutRepository::new(store);
    let editor = ControlEditor::new(config.default_cycle_hours.max(1) * 3_600_000);

    match cli.command {
        Commands::Status { wallet, json } => handlers::handle_status(&repo, &wallet, json)?,
        Commands::List => handlers::handle_list(&repo)?,
        Commands::Pause { wallet } => handlers::handle_pause(&repo, &editor, &wallet)?,
        Commands::Resume { wallet } => handlers::handle_resume(&repo, &editor, &wallet)?,
        Commands::Shift { wallet, minutes } => {
            handlers::handle_shift(&repo, &editor, &wallet, minutes)?
        }
        Commands::SetTime { wallet, timestamp } => {
            handlers::handle_set_time(&repo, &editor, &wallet, &timestamp)?
        }
        Commands::StartCycle { wallet, hours } => {
            handlers::handle_start_cycle(&repo, &editor, &wallet, hours)?
        }
        Commands::Reset { wallet } => handlers::handle_reset(&repo, &editor, &wallet)?,
        Commands::Watch { wallet, interval } => {
            handlers::handle_watch(&repo, &wallet, interval).await?
        }
    }

    Ok(())
}
