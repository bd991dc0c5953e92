//! pd-gateway: PagerDuty gateway main binary
//!
//! Usage:
//!   pd-gateway                      - Start server mode (HTTP API)
//!   pd-gateway --cli                - Start interactive CLI mode
//!   pd-gateway --execute "oncall"   - Run one command and exit
//!   pd-gateway --autocomplete       - Print the slash command autocomplete tree
//!   pd-gateway --help               - Show help

mod cli;

use std::sync::Arc;

use pd_api::AppState;
use pd_command::CommandHandler;
use pd_core::{
    Config, InMemoryKvStore, KvStore, PagerDutyClient, ScheduleCache, SharedConfig, SqliteKvStore,
};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// HTTP API server
    Server,
    /// Interactive CLI mode
    Cli,
    /// Run one command and exit
    Execute(String),
    /// Print autocomplete data as JSON
    Autocomplete,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1));

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("pd-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Autocomplete => {
            let data = CommandHandler::autocomplete_data();
            println!("{}", serde_json::to_string_pretty(&data)?);
            return Ok(());
        }
        _ => {}
    }

    // .env may set RUST_LOG, so it is loaded before the subscriber
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_env_filter(log_filter()?).init();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    if let Err(e) = config.pagerduty.validate() {
        tracing::warn!("PagerDuty is not configured yet: {}", e);
    }

    let store = open_store(&config)?;
    let cache = ScheduleCache::new(store, config.cache.schedules_ttl_secs);
    let shared = SharedConfig::new(config);

    let client = PagerDutyClient::new(shared.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create PagerDuty client: {}", e))?;
    let pagerduty: Arc<dyn pd_core::PagerDutyApi> = Arc::new(client);

    match mode {
        RunMode::Cli => {
            tracing::info!("Running in CLI mode");
            let handler = CommandHandler::new(pagerduty, cache, shared);
            cli::run_cli(handler).await
        }
        RunMode::Execute(command) => {
            let handler = CommandHandler::new(pagerduty, cache, shared);
            cli::run_execute(&handler, &command).await
        }
        RunMode::Server => run_server(AppState::new(shared, pagerduty, cache)).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> RunMode {
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--cli" | "-c" => return RunMode::Cli,
            "--execute" | "-e" => {
                let command: Vec<String> = args.collect();
                return RunMode::Execute(command.join(" "));
            }
            "--autocomplete" => return RunMode::Autocomplete,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

fn print_help() {
    println!("pd-gateway - PagerDuty on-call and paging gateway");
    println!();
    println!("Usage:");
    println!("  pd-gateway                    Start server mode (HTTP API)");
    println!("  pd-gateway --cli              Start interactive CLI mode");
    println!("  pd-gateway --execute <cmd>    Run one /pagerduty command and exit");
    println!("  pd-gateway --autocomplete     Print the slash command autocomplete tree");
    println!("  pd-gateway --help             Show this help message");
    println!("  pd-gateway --version          Show version");
    println!();
    println!("Configuration is read from ./pd-gateway.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  PAGERDUTY_API_TOKEN      REST API token (required)");
    println!("  PAGERDUTY_API_BASE_URL   Custom API endpoint");
    println!("  PAGERDUTY_FROM_EMAIL     Requester email for created incidents");
    println!("  API_PORT                 HTTP API port (default: 3000)");
    println!("  API_RATE_LIMIT           Requests per user per minute (default: 120)");
    println!("  CACHE_DB_PATH            SQLite cache path (default: in memory)");
    println!("  CACHE_TTL_SECS           Schedule cache lifetime (default: 300)");
}

/// `RUST_LOG` directives on top of an `info` default
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive("info".parse()?))
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    match &config.cache.db_path {
        Some(path) => {
            let store = SqliteKvStore::new(path)
                .map_err(|e| anyhow::anyhow!("Failed to open cache database: {}", e))?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("Using in-memory schedule cache");
            Ok(Arc::new(InMemoryKvStore::new()))
        }
    }
}

/// Run server mode until Ctrl+C
async fn run_server(state: AppState) -> anyhow::Result<()> {
    #[cfg(unix)]
    let reload_handle = tokio::spawn(reload_on_sighup(state.config.clone()));

    let port = state.config.get().api.port;
    tracing::info!("pd-gateway starting on port {}", port);
    tracing::info!("Press Ctrl+C to exit");

    pd_api::start_server(state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        tracing::info!("Shutting down...");
    })
    .await?;

    #[cfg(unix)]
    reload_handle.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Reload the configuration file whenever SIGHUP arrives
#[cfg(unix)]
async fn reload_on_sighup(config: SharedConfig) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Configuration reload disabled: {}", e);
            return;
        }
    };

    while hangups.recv().await.is_some() {
        match Config::load() {
            Ok(new_config) => {
                if let Err(e) = new_config.pagerduty.validate() {
                    tracing::warn!("Reloaded configuration is not usable yet: {}", e);
                }
                config.set(new_config);
                tracing::info!("Configuration reloaded");
            }
            Err(e) => tracing::error!("Configuration reload failed, keeping previous: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_filter_reads_env_file() {
        let mut env_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(env_file, "RUST_LOG=pd_core=debug").unwrap();
        dotenvy::from_path_override(env_file.path()).unwrap();

        let filter = log_filter().unwrap().to_string();
        assert!(filter.contains("pd_core=debug"), "{}", filter);
        assert!(filter.contains("info"), "{}", filter);
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        assert!(matches!(parse_args(args(&[])), RunMode::Server));
        assert!(matches!(parse_args(args(&["--cli"])), RunMode::Cli));
        assert!(matches!(parse_args(args(&["-h"])), RunMode::Help));
        assert!(matches!(parse_args(args(&["--autocomplete"])), RunMode::Autocomplete));
        assert!(matches!(parse_args(args(&["--unknown"])), RunMode::Server));
    }

    #[test]
    fn test_parse_execute_collects_rest() {
        match parse_args(args(&["--execute", "schedule", "S1"])) {
            RunMode::Execute(command) => assert_eq!(command, "schedule S1"),
            _ => panic!("expected execute mode"),
        }
    }

    #[test]
    fn test_open_store_defaults_to_memory() {
        let store = open_store(&Config::default()).unwrap();
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap().data, b"v");
    }
}
