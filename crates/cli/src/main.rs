//! Ponder CLI — the main entry point.
//!
//! Commands:
//! - (none)   — Interactive question loop
//! - `ask`    — Answer a single question and exit
//! - `onboard` — Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ponder",
    about = "Ponder — a ReAct question-answering agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.ponder/config.toml
    #[arg(short, long, global = true, env = "PONDER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question and exit
    Ask {
        /// The question to answer
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Initialize configuration
    Onboard,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay clean.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        None => commands::agent::run(None, cli.config).await,
        Some(Commands::Ask { question }) => {
            commands::agent::run(Some(question.join(" ")), cli.config).await
        }
        Some(Commands::Onboard) => commands::onboard::run(cli.config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
