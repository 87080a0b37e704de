//! TickerPulse — stock-ticker mention scanner.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! and runs the scrape→rank→persist loop until Ctrl+C.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use tickerpulse::config::{self, Retention};
use tickerpulse::engine::aggregator::CycleAggregator;
use tickerpulse::engine::scheduler::CycleScheduler;
use tickerpulse::sources::http::HttpSessions;
use tickerpulse::storage::{self, JsonFileSink};

const BANNER: &str = r#"
  =========================================
   T I C K E R P U L S E
   Cashtag mention scanner v0.1.0
  =========================================
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = config::AppConfig::path_from_env();
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        name = %cfg.scanner.name,
        config = %config_path,
        interval_minutes = cfg.scanner.interval_minutes,
        concurrency = cfg.scanner.concurrency,
        accounts = cfg.sources.accounts.len(),
        output = %cfg.output.path,
        retention = ?cfg.output.retention,
        "TickerPulse starting up"
    );

    if cfg.sources.accounts.is_empty() {
        warn!("No accounts configured, every cycle will produce an empty snapshot");
    }
    if cfg.fetcher.render_endpoint.is_none() {
        warn!("No render endpoint configured, profiles will be fetched as raw HTML");
    }
    if cfg.output.retention == Retention::Overwrite {
        // Only reported: the previous snapshot is replaced by the first cycle.
        match storage::load_snapshot(Path::new(&cfg.output.path)) {
            Ok(Some(previous)) => {
                info!(symbols = previous.len(), "Previous snapshot will be overwritten")
            }
            Ok(None) => {}
            Err(e) => warn!(
                path = %cfg.output.path,
                error = format!("{e:#}"),
                "Previous snapshot is unreadable, it will be overwritten"
            ),
        }
    }

    let scheduler = CycleScheduler::new(
        CycleAggregator::from_config(&cfg.scanner),
        cfg.source_refs(),
        Box::new(HttpSessions::new(cfg.fetcher.clone())),
        Box::new(JsonFileSink::from_config(&cfg.output)),
        cfg.scanner.interval(),
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let cycles = scheduler.run(shutdown).await;
    info!(cycles, "TickerPulse shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tickerpulse=info"));

    let json_logging = std::env::var("TICKERPULSE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
