//! Typed settings tree for every fare monitor component
//!
//! Every section implements `Default`, so a configuration file only needs the
//! keys it wants to override.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Rejected configuration value
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid configuration for '{field}': {reason}")]
pub struct SettingsError {
    pub field: &'static str,
    pub reason: String,
}

impl SettingsError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Complete configuration for the monitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub logging: LoggingSettings,
    pub provider: ProviderSettings,
    pub scraper: ScraperSettings,
    pub tokens: TokenSettings,
    pub airports: AirportSettings,
    pub deals: DealSettings,
    pub topics: TopicSettings,
    pub notifications: NotificationSettings,
    pub stats: StatsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Fare provider endpoints and fixed query parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider label stored with every observation
    pub name: String,
    /// Airline code stamped on every observation; part of each slot identity
    pub airline: String,
    /// JSON offers endpoint
    pub api_base_url: String,
    /// Public offers page carrying the embedded access token
    pub site_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub cabin_class: String,
    pub adults: u8,
    pub children: u8,
    pub infants: u8,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: "AerolineasARG".to_string(),
            airline: "AR".to_string(),
            api_base_url: "https://api.aerolineas.com.ar/v1/flights/offers".to_string(),
            site_base_url: "https://www.aerolineas.com.ar/flights-offers".to_string(),
            request_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/126.0 Safari/537.36"
                .to_string(),
            cabin_class: "Economy".to_string(),
            adults: 1,
            children: 0,
            infants: 0,
        }
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Scrape cycle sizing and throttling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Queue workers draining one cycle
    pub max_workers: usize,
    /// Concurrent provider requests; defaults to `max_workers`
    pub max_concurrent_requests: Option<usize>,
    /// Months ahead to query (16th of each month)
    pub max_month_scraping: u32,
    /// Pause after every attempt, success or handled failure
    pub error_delay_ms: u64,
    /// Global request quota, 0 disables it
    pub requests_per_minute: u32,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_concurrent_requests: None,
            max_month_scraping: 6,
            error_delay_ms: 5_000,
            requests_per_minute: 0,
        }
    }
}

impl ScraperSettings {
    pub fn request_permits(&self) -> usize {
        self.max_concurrent_requests.unwrap_or(self.max_workers)
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }
}

/// Token finder, validator and pool loader timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Validator sweep interval; also the pool loader's idle wait
    pub validation_interval_secs: u64,
    /// Expired probes tolerated before a token is invalidated
    pub max_retries: u32,
    /// Finder back-off after finding an already known token
    pub duplicate_backoff_secs: u64,
    /// Pool loader polling interval
    pub refresh_interval_secs: u64,
    /// Probe dates are drawn from today up to this many days ahead
    pub probe_window_days: u32,
    /// Pause between retryable failures in the finder and validator
    pub error_delay_ms: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            validation_interval_secs: 300,
            max_retries: 3,
            duplicate_backoff_secs: 10,
            refresh_interval_secs: 10,
            probe_window_days: 60,
            error_delay_ms: 5_000,
        }
    }
}

impl TokenSettings {
    pub fn validation_interval(&self) -> Duration {
        Duration::from_secs(self.validation_interval_secs)
    }

    pub fn duplicate_backoff(&self) -> Duration {
        Duration::from_secs(self.duplicate_backoff_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }
}

/// Airports grouped by metro area
///
/// Group names are free-form labels (lower-case keeps them stable across
/// configuration sources). Groups whose name contains `_` are disabled
/// without deleting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportSettings {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl Default for AirportSettings {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert("bue".to_string(), vec!["AEP".to_string(), "EZE".to_string()]);
        groups.insert("cor".to_string(), vec!["COR".to_string()]);
        groups.insert("mdz".to_string(), vec!["MDZ".to_string()]);
        Self { groups }
    }
}

impl AirportSettings {
    /// Groups that take part in route generation
    pub fn enabled_groups(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.groups.iter().filter(|(name, _)| !name.contains('_'))
    }
}

/// Deal classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealSettings {
    /// Extreme check is skipped when price > factor × known monthly minimum
    pub min_real_price_factor: Decimal,
    /// `threshold = q1 - factor × iqr`
    pub extreme_threshold_factor: Decimal,
    pub extreme_min_percentage_off: Decimal,
    /// Percentage off that is extreme regardless of the threshold
    pub extreme_percentage_off_flat: Decimal,
    pub deal_q1_discount_factor: Decimal,
    pub deal_min_percentage_off: Decimal,
    /// Discount applied to q1 when the bucket has no spread
    pub no_iqr_discount_factor: Decimal,
}

impl Default for DealSettings {
    fn default() -> Self {
        Self {
            min_real_price_factor: dec!(1.3),
            extreme_threshold_factor: dec!(1.5),
            extreme_min_percentage_off: dec!(40),
            extreme_percentage_off_flat: dec!(60),
            deal_q1_discount_factor: dec!(0.85),
            deal_min_percentage_off: dec!(15),
            no_iqr_discount_factor: dec!(0.8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    pub group_id: String,
    /// Messages handled concurrently by one consumer
    pub max_workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSettings {
    /// Scraper → consumer calendar batches
    pub calendar: TopicConfig,
    /// Consumer → notifier alert contexts
    pub alerts: TopicConfig,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            calendar: TopicConfig {
                name: "producer_to_etl".to_string(),
                group_id: "etl_flights".to_string(),
                max_workers: 8,
            },
            alerts: TopicConfig {
                name: "etl_to_notifier".to_string(),
                group_id: "notifier_flights".to_string(),
                max_workers: 4,
            },
        }
    }
}

/// Notification routing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Operator channel for fatal errors
    pub admin_webhook: Option<String>,
    /// Deal channel for origins without a dedicated webhook
    pub default_webhook: Option<String>,
    /// Deal channel per origin IATA code
    pub deal_webhooks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    pub recompute_interval_secs: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            recompute_interval_secs: 3_600,
        }
    }
}

impl StatsSettings {
    pub fn recompute_interval(&self) -> Duration {
        Duration::from_secs(self.recompute_interval_secs)
    }
}

impl MonitorSettings {
    /// Reject values no component can run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.scraper.max_workers == 0 {
            return Err(SettingsError::new("scraper.max_workers", "must be at least 1"));
        }
        if self.scraper.request_permits() == 0 {
            return Err(SettingsError::new(
                "scraper.max_concurrent_requests",
                "must be at least 1",
            ));
        }
        if self.tokens.max_retries == 0 {
            return Err(SettingsError::new("tokens.max_retries", "must be at least 1"));
        }
        if self.tokens.probe_window_days == 0 {
            return Err(SettingsError::new("tokens.probe_window_days", "must be at least 1"));
        }
        if self.topics.calendar.max_workers == 0 || self.topics.alerts.max_workers == 0 {
            return Err(SettingsError::new("topics.*.max_workers", "must be at least 1"));
        }
        if self.airports.enabled_groups().count() < 2 {
            return Err(SettingsError::new(
                "airports.groups",
                "need at least two enabled metro groups to form a route",
            ));
        }

        let deals = &self.deals;
        for (field, value) in [
            ("deals.min_real_price_factor", deals.min_real_price_factor),
            ("deals.extreme_threshold_factor", deals.extreme_threshold_factor),
            ("deals.deal_q1_discount_factor", deals.deal_q1_discount_factor),
            ("deals.no_iqr_discount_factor", deals.no_iqr_discount_factor),
        ] {
            if value <= Decimal::ZERO {
                return Err(SettingsError::new(field, format!("must be positive, got {}", value)));
            }
        }
        Ok(())
    }
}
