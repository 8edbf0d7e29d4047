mod cli;
mod desktop;
mod google;
mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gcalert_core::{scheduler, AlarmCache, AlarmScanner, FetchDriver};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use desktop::DesktopNotifier;
use google::GoogleAuth;
use settings::{Settings, Verbosity};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;

    init_logging(settings.verbosity);

    info!("gcalert {} running...", env!("CARGO_PKG_VERSION"));
    debug!(
        "SETTINGS: secrets_file={} alarm_interval={}s query_interval={}s lookahead_days={} \
         reconnect_interval={}s threads_offset={}s time_format={:?} icon={}",
        settings.secrets_file.display(),
        settings.alarm_interval.as_secs(),
        settings.query_interval.as_secs(),
        settings.lookahead_days,
        settings.reconnect_interval.as_secs(),
        settings.threads_offset.as_secs(),
        settings.time_format.as_str(),
        settings.icon,
    );

    let cache = Arc::new(AlarmCache::new());

    let driver = FetchDriver::new(
        GoogleAuth::new(settings.secrets_file.clone()),
        Arc::clone(&cache),
        settings.fetch_settings(),
    );
    let scanner = AlarmScanner::new(cache, Arc::new(DesktopNotifier), settings.icon.clone());

    tokio::select! {
        _ = scheduler::run(driver, scanner, settings.scan_settings()) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for SIGINT")?;
            info!("Shutting down on SIGINT.");
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the verbosity flags when set.
fn init_logging(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Quiet => "warn",
        Verbosity::Normal => "info",
        Verbosity::Debug => "debug",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,gcalert={level},gcalert_core={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
