use anyhow::{Context, Result};
use clap::Parser;
use config::logging::init_tracing;
use config::{log_critical, ConfigManager, ConfigSources};
use deal_alerts_strategy::app::{build_notifier, run_monitor};
use deal_alerts_strategy::ComponentFailure;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Flight fare monitor: scrapes fare calendars and alerts on deals
#[derive(Debug, Parser)]
#[command(name = "fare_monitor", version)]
struct Args {
    /// TOML configuration file; built-in defaults and FARE_* variables otherwise
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let sources = match args.config {
        Some(path) => ConfigSources::file(path),
        None => ConfigSources {
            use_env: true,
            ..ConfigSources::default()
        },
    };
    let manager = ConfigManager::load(sources).context("Failed to load configuration")?;
    let settings = manager.settings();
    init_tracing(&settings.logging)?;
    settings.validate().context("Invalid configuration")?;

    info!("🚀 Starting fare monitor for {}", settings.provider.name);
    let operator = build_notifier(&settings.notifications, settings.provider.request_timeout())?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Shutdown requested");
                cancel.cancel();
            }
        }
    });

    if let Err(e) = run_monitor(&settings, Arc::clone(&operator), cancel).await {
        log_critical!("Fare monitor terminated: {:#}", e);
        // Component failures were already reported by the supervisor
        if e.downcast_ref::<ComponentFailure>().is_none() {
            if let Err(report) = operator.send_admin_error("fare_monitor", &format!("{:#}", e)).await {
                warn!("Failed to report startup failure: {}", report);
            }
        }
        return Err(e);
    }
    Ok(())
}
