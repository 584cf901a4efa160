//! Homework relay CLI
//!
//! Main entry point for relaying homework review statuses to a chat.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use homework_relay::{
    Credentials, PollState, Poller, PracticumClient, Settings, TelegramNotifier,
};
use tracing_subscriber::EnvFilter;

/// Homework relay - review status notifier
///
/// Polls the homework review API on a fixed period and sends a chat message
/// whenever the status of the newest submission changes.
#[derive(Parser, Debug)]
#[command(name = "homework-relay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to settings file (default: homework-relay.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Override the delay between polls
    #[arg(long, value_name = "SECONDS")]
    retry_period: Option<u64>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Tokens may come from a .env file in the working directory
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    // No .env file is fine; a broken one is worth knowing about
    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
    }

    match run_relay(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the relay until interrupted.
///
/// 1. Check credentials (before any network call)
/// 2. Load settings and apply CLI overrides
/// 3. Build the API and chat clients
/// 4. Poll forever, stopping on Ctrl+C
async fn run_relay(args: Args) -> anyhow::Result<()> {
    let credentials = Credentials::from_env()?;

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(retry_period) = args.retry_period {
        settings.retry_period = retry_period;
    }

    // Re-validate after overrides
    settings.validate()?;

    tracing::info!(
        endpoint = %settings.endpoint,
        retry_period = settings.retry_period,
        request_timeout = settings.request_timeout,
        chat_id = %credentials.telegram_chat_id,
        "Homework relay starting"
    );

    let source = PracticumClient::new(
        settings.endpoint.as_str(),
        credentials.practicum_token.as_str(),
        settings.request_timeout(),
    )?;
    let notifier = TelegramNotifier::new(
        &settings.telegram_api_url,
        &credentials.telegram_token,
        credentials.telegram_chat_id.as_str(),
        settings.request_timeout(),
    )?;

    let mut poller = Poller::new(
        source,
        notifier,
        PollState::starting_now(),
        settings.retry_period(),
    );

    tokio::select! {
        () = poller.run() => {}
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    }

    let state = poller.state();
    tracing::info!(
        cycles = state.cycles,
        cursor = state.cursor,
        uptime_secs = state.elapsed().num_seconds(),
        "Homework relay stopped"
    );

    Ok(())
}

/// Loads settings from the specified path or default location.
fn load_settings(config_path: Option<&str>) -> anyhow::Result<Settings> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Ok(Settings::load_from_file(path)?)
        }
        None => Ok(Settings::load()?),
    }
}
