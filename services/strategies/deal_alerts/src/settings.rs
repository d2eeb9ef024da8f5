//! # Deal Pipeline Settings
//!
//! ## Purpose
//!
//! Collects the parts of [`MonitorSettings`] the deal side of the pipeline
//! runs on (thresholds, topics, recompute cadence) and rejects threshold
//! combinations that would make the classifier meaningless.
//!
//! ## Integration Points
//!
//! - **Input Sources**: the typed snapshot from `config::ConfigManager`
//! - **Output Destinations**: [`crate::DealAnalyzer`], the calendar consumer,
//!   the notifier and the statistics job

use config::{DealSettings, MonitorSettings, TopicConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineConfigError {
    #[error("deals.{field} must be positive, got {value}")]
    NonPositiveFactor { field: &'static str, value: Decimal },

    #[error("deals.{field} must be within 0..=100, got {value}")]
    PercentageOutOfRange { field: &'static str, value: Decimal },

    #[error("topics.{topic}.max_workers must be at least 1")]
    NoWorkers { topic: &'static str },
}

/// Settings for the consumer, notifier and statistics job
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub provider: String,
    pub deals: DealSettings,
    /// Consumed by the calendar consumer
    pub calendar: TopicConfig,
    /// Produced by the dispatcher, consumed by the notifier
    pub alerts: TopicConfig,
    pub stats_interval: Duration,
}

impl PipelineConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Result<Self, PipelineConfigError> {
        let config = Self {
            provider: settings.provider.name.clone(),
            deals: settings.deals.clone(),
            calendar: settings.topics.calendar.clone(),
            alerts: settings.topics.alerts.clone(),
            stats_interval: settings.stats.recompute_interval(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineConfigError> {
        validate_deals(&self.deals)?;
        if self.calendar.max_workers == 0 {
            return Err(PipelineConfigError::NoWorkers { topic: "calendar" });
        }
        if self.alerts.max_workers == 0 {
            return Err(PipelineConfigError::NoWorkers { topic: "alerts" });
        }
        Ok(())
    }
}

/// Factors must be positive; percentage thresholds must be percentages
pub fn validate_deals(deals: &DealSettings) -> Result<(), PipelineConfigError> {
    let factors = [
        ("min_real_price_factor", deals.min_real_price_factor),
        ("extreme_threshold_factor", deals.extreme_threshold_factor),
        ("deal_q1_discount_factor", deals.deal_q1_discount_factor),
        ("no_iqr_discount_factor", deals.no_iqr_discount_factor),
    ];
    for (field, value) in factors {
        if value <= Decimal::ZERO {
            return Err(PipelineConfigError::NonPositiveFactor { field, value });
        }
    }

    let percentages = [
        ("extreme_min_percentage_off", deals.extreme_min_percentage_off),
        ("extreme_percentage_off_flat", deals.extreme_percentage_off_flat),
        ("deal_min_percentage_off", deals.deal_min_percentage_off),
    ];
    for (field, value) in percentages {
        if value < Decimal::ZERO || value > dec!(100) {
            return Err(PipelineConfigError::PercentageOutOfRange { field, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::from_settings(&MonitorSettings::default()).unwrap();
        assert_eq!(config.deals.extreme_threshold_factor, dec!(1.5));
        assert_eq!(config.stats_interval, Duration::from_secs(3_600));
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut settings = MonitorSettings::default();
        settings.deals.deal_q1_discount_factor = dec!(0);
        assert_eq!(
            PipelineConfig::from_settings(&settings).unwrap_err(),
            PipelineConfigError::NonPositiveFactor {
                field: "deal_q1_discount_factor",
                value: dec!(0)
            }
        );

        let mut settings = MonitorSettings::default();
        settings.deals.extreme_percentage_off_flat = dec!(120);
        assert!(matches!(
            PipelineConfig::from_settings(&settings),
            Err(PipelineConfigError::PercentageOutOfRange { .. })
        ));
    }
}
