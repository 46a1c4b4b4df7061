//! Main entry point for Query Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use query_translator::cli::commands::{self, Commands, ConfigOverrides};

/// Query Translator - launcher-style DeepL lookups
#[derive(Parser, Debug)]
#[command(name = "query-translator", version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        "debug".to_string()
    } else {
        "info".to_string()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={}", env!("CARGO_CRATE_NAME"), log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Execute command
    match args.command {
        Some(Commands::Query { text }) => {
            commands::handle_query(text, &args.overrides).await?;
        }
        Some(Commands::Usage) => {
            commands::handle_usage(&args.overrides).await?;
        }
        Some(Commands::Serve { host, port }) => {
            commands::handle_serve(host, port, &args.overrides).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
