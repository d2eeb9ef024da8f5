//! Standardized tracing setup and emoji logging for fare monitor services
//!
//! Every long-running loop logs through these macros so the same kind of
//! event reads the same way across the scraper, token workers and deal engine.

use crate::settings::LoggingSettings;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Standard emoji set for fare monitor logging
pub struct LogEmoji;

impl LogEmoji {
    // Status indicators
    pub const SUCCESS: &'static str = "✅"; // Operation succeeded
    pub const ERROR: &'static str = "❌"; // Recoverable failure
    pub const CRITICAL: &'static str = "🚨"; // Fatal, loop terminating
    pub const WARNING: &'static str = "⚠️"; // Warning or caution

    // Module-specific
    pub const SEARCH: &'static str = "🔍"; // Token discovery / probing
    pub const CHART: &'static str = "📊"; // Statistics
    pub const DEAL: &'static str = "🔥"; // Deal found
    pub const CYCLE: &'static str = "🔁"; // Scrape cycle boundaries
    pub const KEY: &'static str = "🔑"; // Token pool changes
    pub const CLOCK: &'static str = "⏱️"; // Timing
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", settings.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SUCCESS, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!("{} {}", $crate::logging::LogEmoji::ERROR, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)*) => {
        tracing::error!("{} {}", $crate::logging::LogEmoji::CRITICAL, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_search {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SEARCH, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_metrics {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CHART, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_deal {
    ($($arg:tt)*) => {
        tracing::warn!("{} {}", $crate::logging::LogEmoji::DEAL, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_cycle {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CYCLE, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_tokens {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::KEY, format!($($arg)*))
    };
}
