//! NoCookie CLI
//!
//! Classify URLs, inspect and edit a stored extension state, and replay
//! navigation traffic through the redirect core.

mod replay;
mod store;
mod watch;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use nc_core::background::Background;
use nc_core::clock::SystemClock;
use nc_core::config::MonitorConfig;
use nc_core::platform::Platform;
use nc_core::storage::{KeyValueStore, MemoryStore};
use nc_core::url::{classify, is_monitored_host};

use crate::replay::RecordingNavigator;
use crate::store::JsonFileStore;
use crate::watch::LinePage;

#[derive(Parser)]
#[command(name = "nc-cli")]
#[command(about = "NoCookie redirect tools")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify URLs and show their no-cookie rewrite
    Classify {
        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,

        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Show the enabled flag and redirect counters
    Status {
        /// Storage file
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Turn redirects on
    Enable {
        /// Storage file
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Turn redirects off
    Disable {
        /// Storage file
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Write first-install defaults
    Install {
        /// Storage file
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Feed recorded navigation events through the pre-navigation hook
    Replay {
        /// Storage file
        #[arg(short, long)]
        store: PathBuf,

        /// JSON lines of navigation events
        #[arg(short, long)]
        events: PathBuf,
    },

    /// Run the in-page monitor over locations read from stdin
    Watch {
        /// Storage file (in-memory when omitted)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Monitor timing config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Classify { urls, json } => cmd_classify(&urls, json),
        Commands::Status { store } => block_on(cmd_status(&store)),
        Commands::Enable { store } => block_on(cmd_set_enabled(&store, true)),
        Commands::Disable { store } => block_on(cmd_set_enabled(&store, false)),
        Commands::Install { store } => block_on(cmd_install(&store)),
        Commands::Replay { store, events } => block_on(cmd_replay(&store, &events)),
        Commands::Watch { store, config } => block_on(cmd_watch(store.as_deref(), config.as_deref())),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Also installs the bridge that forwards `log` records from nc-core.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn block_on<F>(future: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(future)
}

fn headless_background(store: Arc<dyn KeyValueStore>) -> Background {
    Background::new(
        store,
        Arc::new(SystemClock),
        Platform::headless(Arc::new(RecordingNavigator::default())),
    )
}

fn file_background(path: &Path) -> Background {
    headless_background(Arc::new(JsonFileStore::new(path)))
}

fn print_response(response: &nc_core::message::Response) -> Result<(), String> {
    let text = serde_json::to_string_pretty(response)
        .map_err(|e| format!("Failed to encode response: {}", e))?;
    println!("{}", text);
    if response.ok {
        Ok(())
    } else {
        Err(response.error.clone().unwrap_or_default())
    }
}

fn cmd_classify(urls: &[String], as_json: bool) -> Result<(), String> {
    for url in urls {
        let result = classify(url);
        if as_json {
            let line = json!({
                "url": url,
                "monitored": is_monitored_host(url),
                "isVideo": result.is_video,
                "rewritten": result.rewritten,
            });
            println!("{}", line);
        } else {
            match &result.rewritten {
                Some(target) => println!("{} -> {}", url, target),
                None if result.is_video => println!("{} (video, no rewrite)", url),
                None => println!("{} (no rewrite)", url),
            }
        }
    }
    Ok(())
}

async fn cmd_status(store: &Path) -> Result<(), String> {
    let response = file_background(store)
        .handle_message(&json!({"type": "getState"}))
        .await;
    print_response(&response)
}

async fn cmd_set_enabled(store: &Path, enabled: bool) -> Result<(), String> {
    let response = file_background(store)
        .handle_message(&json!({"type": "setEnabled", "enabled": enabled}))
        .await;
    print_response(&response)
}

async fn cmd_install(store: &Path) -> Result<(), String> {
    let background = file_background(store);
    background
        .on_installed()
        .await
        .map_err(|e| format!("Install failed: {}", e))?;

    let (enabled, stats) = background
        .state()
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;
    println!("Installed into '{}'", store.display());
    println!("  Enabled:     {}", enabled);
    println!("  Redirects:   {} total, {} today", stats.total, stats.today);
    Ok(())
}

async fn cmd_replay(store: &Path, events: &Path) -> Result<(), String> {
    let content = fs::read_to_string(events)
        .map_err(|e| format!("Failed to read '{}': {}", events.display(), e))?;
    let (records, skipped) = replay::parse_events(&content);

    let navigator = Arc::new(RecordingNavigator::default());
    let background = Background::new(
        Arc::new(JsonFileStore::new(store)),
        Arc::new(SystemClock),
        Platform::headless(navigator.clone()),
    );
    let mut report = replay::replay(&background, &records).await;
    report.skipped_lines = skipped;

    let (_, stats) = background
        .state()
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;

    println!("Replayed {} events from '{}'", report.events, events.display());
    println!("  Redirects:   {} ({} tab updates)", report.redirects, navigator.updates().len());
    println!("  Skipped:     {} lines", report.skipped_lines);
    println!("  Stats:       {} total, {} today", stats.total, stats.today);
    Ok(())
}

async fn cmd_watch(store: Option<&Path>, config: Option<&Path>) -> Result<(), String> {
    let config = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            MonitorConfig::from_json(&text).map_err(|e| format!("{}: {}", path.display(), e))?
        }
        None => MonitorConfig::default(),
    };

    let store: Arc<dyn KeyValueStore> = match store {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let background = Arc::new(headless_background(store));
    let page = Arc::new(LinePage::default());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let summary = watch::watch(background, page, config, stdin).await?;

    println!("Checks: {}, redirects: {}", summary.checks, summary.redirects);
    Ok(())
}
