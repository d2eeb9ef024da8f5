//! # Fare Monitor Centralized Configuration
//!
//! Configuration management and logging setup shared by all fare monitor
//! services, replacing per-service ad-hoc config loading.
//!
//! ## Features
//!
//! - **Layered Sources**: defaults → TOML file → environment overlay → `FARE_` variables
//! - **Typed Settings**: [`MonitorSettings`] with validation before use
//! - **Explicit Reload**: [`ConfigManager::reload`] swaps the snapshot atomically
//! - **Logging**: [`logging::init_tracing`] and the `log_*!` emoji macros
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::{ConfigManager, ConfigSources};
//!
//! let manager = ConfigManager::load(ConfigSources::file("config/monitor.toml"))?;
//! let workers = manager.settings().scraper.max_workers;
//! let factor: f64 = manager.get("deals.extreme_threshold_factor")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod manager;
pub mod settings;

pub use manager::{ConfigManager, ConfigSources, ENV_PREFIX};
pub use settings::{
    AirportSettings, DealSettings, LoggingSettings, MonitorSettings, NotificationSettings,
    ProviderSettings, ScraperSettings, SettingsError, StatsSettings, TokenSettings, TopicConfig,
    TopicSettings,
};
