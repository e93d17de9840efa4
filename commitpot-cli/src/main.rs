mod commands;

use clap::{Parser, Subcommand};
use commitpot_game::GameError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "commitpot")]
#[command(about = "Commit-reveal guessing round with a shared pot")]
#[command(version)]
struct Cli {
    /// Data directory for the ledger and round state
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the round slot owned by an operator
    Init {
        /// Operator account
        operator: String,
    },
    /// Compute the commitment to publish for a secret and salt
    Commitment {
        /// Secret value
        secret: String,
        /// Salt
        salt: u64,
        /// Treat the secret as hex
        #[arg(long)]
        hex: bool,
    },
    /// Open a round with a published commitment
    Commit {
        /// Operator account
        operator: String,
        /// Commitment (hex)
        commitment: String,
        /// Guess period in seconds
        #[arg(long)]
        guess_period: Option<i64>,
        /// Reveal period in seconds, counted from the guess deadline
        #[arg(long)]
        reveal_period: Option<i64>,
        /// Minimum stake in satoshis
        #[arg(long)]
        min_stake: Option<u64>,
    },
    /// Place a guess with a stake
    Guess {
        /// Participant account
        participant: String,
        /// Guess (0-255)
        value: u8,
        /// Stake in satoshis
        stake: u64,
    },
    /// Reveal the committed secret
    Reveal {
        /// Operator account
        operator: String,
        /// Secret value
        secret: String,
        /// Salt
        salt: u64,
        /// Treat the secret as hex
        #[arg(long)]
        hex: bool,
    },
    /// Claim winnings after the reveal
    Claim {
        /// Participant account
        participant: String,
    },
    /// Take back a stake after a missed reveal
    Refund {
        /// Participant account
        participant: String,
    },
    /// Clear the round for a new game
    Reset {
        /// Operator account
        operator: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Withdraw funds from the pot
    Withdraw {
        /// Operator account
        operator: String,
        /// Amount in satoshis
        amount: u64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show round status
    Status,
    /// List entries in registration order
    Entries,
    /// Show the event log
    Events {
        /// Number of events to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Ledger account commands
    #[command(subcommand)]
    Account(commands::AccountCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "commitpot={},commitpot_game={},commitpot_core={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("commitpot")
    });

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    let ctx = commands::Context::open(&data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Init { operator } => commands::init_round(&ctx, &operator).await,
        Commands::Commitment { secret, salt, hex } => {
            commands::show_commitment(&secret, salt, hex)
        }
        Commands::Commit {
            operator,
            commitment,
            guess_period,
            reveal_period,
            min_stake,
        } => {
            commands::commit_round(
                &ctx,
                &operator,
                &commitment,
                guess_period,
                reveal_period,
                min_stake,
            )
            .await
        }
        Commands::Guess {
            participant,
            value,
            stake,
        } => commands::place_guess(&ctx, &participant, value, stake).await,
        Commands::Reveal {
            operator,
            secret,
            salt,
            hex,
        } => commands::reveal_secret(&ctx, &operator, &secret, salt, hex).await,
        Commands::Claim { participant } => commands::claim_prize(&ctx, &participant).await,
        Commands::Refund { participant } => commands::refund_stake(&ctx, &participant).await,
        Commands::Reset { operator, yes } => commands::reset_round(&ctx, &operator, yes).await,
        Commands::Withdraw {
            operator,
            amount,
            yes,
        } => commands::withdraw(&ctx, &operator, amount, yes).await,
        Commands::Status => commands::show_status(&ctx).await,
        Commands::Entries => commands::show_entries(&ctx).await,
        Commands::Events { limit } => commands::show_events(&ctx, limit).await,
        Commands::Account(cmd) => commands::handle_account_command(cmd, &ctx).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<GameError>() {
            Some(GameError::GuessWindowClosed) => {
                eprintln!("Error: The guess window has closed");
                eprintln!("Use 'commitpot status' to see the round deadlines");
            }
            Some(GameError::RefundNotEligible) => {
                eprintln!("Error: Refunds open only after a missed reveal deadline");
                eprintln!("Use 'commitpot status' to see the round deadlines");
            }
            Some(GameError::InsufficientBalance { need, available }) => {
                eprintln!("Error: Insufficient balance");
                eprintln!("Need: {} sats, Available: {} sats", need, available);
            }
            Some(GameError::TransferFailed(reason)) => {
                eprintln!("Error: Funds could not be moved, nothing was changed");
                eprintln!("Reason: {}", reason);
            }
            _ => {
                eprintln!("Error: {:#}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
