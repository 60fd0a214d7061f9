//! likesweep - retract every like on an X account
//!
//! Fetches the account's liked posts, removes each like, waits out rate
//! limits, and repeats until nothing is left.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use liblikesweep::api::x::XClient;
use liblikesweep::events::EventReceiver;
use liblikesweep::logging::{LogFormat, Logging};
use liblikesweep::{
    Config, EventBus, LikesweepError, LoadOptions, Result, SweepOptions, SweepSummary, Sweeper,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "likesweep")]
#[command(version)]
#[command(about = "Retract every like on an X account, waiting out rate limits")]
#[command(long_about = "\
likesweep - Retract every like on an X account

DESCRIPTION:
    likesweep fetches the account's liked posts, deletes each like in the
    order returned, and fetches again until the API reports no likes left.
    When the API answers 429 it sleeps until the x-rate-limit-reset time
    (60 seconds if the header is missing) before continuing.

USAGE:
    # Credentials from .env in the current directory
    likesweep

    # See what would be removed first
    likesweep --dry-run

    # Stop after 5 pages, print a JSON summary
    likesweep --max-pages 5 --format json

SIGNALS:
    SIGTERM, SIGINT - Stop before the next request or during a rate-limit wait

CONFIGURATION:
    Environment (or .env): CONSUMER_KEY, CONSUMER_SECRET, ACCESS_TOKEN,
    ACCESS_SECRET, TWITTER_ID

    Optional file: ~/.config/likesweep/config.toml

    [api]
    base_url = \"https://api.x.com/2\"
    timeout_secs = 30
    max_results = 100

    [sweep]
    default_rate_limit_wait_secs = 60

EXIT CODES:
    0 - Finished (no likes left, page limit reached, or interrupted)
    1 - API error
    2 - Configuration error
")]
struct Cli {
    /// List the likes on the first page without deleting them
    #[arg(long)]
    dry_run: bool,

    /// Stop after processing this many pages
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Page size requested from the API (1-100)
    #[arg(long, value_name = "N")]
    max_results: Option<u32>,

    /// Path to config.toml (default: ~/.config/likesweep/config.toml)
    #[arg(long, value_name = "PATH", env = "LIKESWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the env file holding credentials (default: ./.env)
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Output format for the final summary (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Log format on stderr (text, json or pretty)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Log more on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    Logging::from_env()
        .with_format(cli.log_format)
        .with_verbosity(cli.verbose)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let json_output = match cli.format.as_str() {
        "text" => false,
        "json" => true,
        other => {
            return Err(LikesweepError::InvalidInput(format!(
                "Invalid format '{}'. Valid options: text, json",
                other
            )))
        }
    };

    let mut config = Config::load_with(&LoadOptions {
        env_file: cli.env_file.clone(),
        config_file: cli.config.clone(),
    })?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let config = Arc::new(config);
    let client = XClient::new(config.clone())?;

    let cancel = CancellationToken::new();
    install_signal_handler(cancel.clone())
        .map_err(|e| LikesweepError::InvalidInput(format!("Signal setup failed: {:#}", e)))?;

    let events = EventBus::default();
    // Keep stdout machine-readable when the summary is JSON
    let narrator = tokio::spawn(narrate(events.subscribe(), json_output));

    let summary = Sweeper::new(&client, &config.account_id, SweepOptions::from(&config.sweep))
        .with_events(events)
        .with_cancellation(cancel)
        .run()
        .await;

    // The sweeper owned the last bus clone; the narrator ends once it drains
    if let Err(e) = narrator.await {
        debug!("Narrator task ended abnormally: {}", e);
    }

    let summary = summary?;
    print_summary(&summary, json_output);
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.dry_run {
        config.sweep.dry_run = true;
    }
    if let Some(max_pages) = cli.max_pages {
        config.sweep.max_pages = Some(max_pages);
    }
    if let Some(max_results) = cli.max_results {
        config.api.max_results = Some(max_results);
    }
}

/// Print each event as a console line until the bus closes
async fn narrate(mut receiver: EventReceiver, to_stderr: bool) {
    while let Some(event) = receiver.recv().await {
        if to_stderr {
            eprintln!("{}", event);
        } else {
            println!("{}", event);
        }
    }
}

fn print_summary(summary: &SweepSummary, json_output: bool) {
    if json_output {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to serialize summary: {}", e),
        }
        return;
    }

    info!(
        pages = summary.pages_fetched,
        retracted = summary.retracted,
        failed = summary.failed,
        "Sweep complete"
    );
    println!(
        "Retracted {} like(s) across {} fetch(es); {} rejected, {} failed, {} rate-limit wait(s).",
        summary.retracted,
        summary.pages_fetched,
        summary.rejected,
        summary.failed,
        summary.rate_limited
    );
}

/// Cancel `token` on SIGINT or SIGTERM
#[cfg(unix)]
fn install_signal_handler(token: CancellationToken) -> anyhow::Result<()> {
    use anyhow::Context;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("registering SIGINT/SIGTERM handlers")?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!(signal = sig, "Received shutdown signal, stopping gracefully...");
            token.cancel();
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handler(token: CancellationToken) -> anyhow::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, stopping gracefully...");
            token.cancel();
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["likesweep"]).unwrap();
        assert!(!cli.dry_run);
        assert!(cli.max_pages.is_none());
        assert_eq!(cli.format, "text");
        assert!(cli.log_format.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "likesweep",
            "--dry-run",
            "--max-pages",
            "3",
            "--max-results",
            "50",
            "--log-format",
            "json",
            "-vv",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.max_pages, Some(3));
        assert_eq!(cli.max_results, Some(50));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_rejects_bad_log_format() {
        assert!(Cli::try_parse_from(["likesweep", "--log-format", "yaml"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let lookup = |key: &str| Some(format!("{}-value", key.to_lowercase()));
        let mut config = Config::from_lookup(lookup, Default::default()).unwrap();
        let cli = Cli::try_parse_from(["likesweep", "--dry-run", "--max-results", "10"]).unwrap();

        apply_overrides(&mut config, &cli);

        assert!(config.sweep.dry_run);
        assert_eq!(config.api.max_results, Some(10));
        assert!(config.sweep.max_pages.is_none());
    }
}
