//! # Price Statistics - Per Route/Class/Month Fare Distribution
//!
//! ## Purpose
//!
//! Summarises every available fare observed for one (route, fare class, month)
//! bucket so the deal engine can compare a fresh price against the bucket's
//! quartiles. Buckets are rebuilt in bulk from the flight store, never
//! incrementally, so a reading may lag the newest observations.
//!
//! ## Computation Rules
//!
//! - Quartiles and median use the continuous percentile (linear interpolation
//!   between closest ranks) and are truncated to whole currency units
//! - `iqr = q3 - q1`, always ≥ 0
//! - Mean rounds half away from zero to whole units
//! - Standard deviation is the sample deviation (n − 1), zero for one sample
//! - A bucket is only trusted once it holds more than three samples

use crate::common::{MonthKey, Route, SlotId};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Smallest sample size whose statistics the deal engine may rely on
pub const MIN_TRUSTED_SAMPLES: usize = 4;

/// Bucket key: route, fare class and departure month
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatsKey {
    pub route: Route,
    pub class: String,
    pub month: MonthKey,
}

impl StatsKey {
    pub fn new(route: Route, class: impl Into<String>, month: MonthKey) -> Self {
        Self {
            route,
            class: class.into(),
            month,
        }
    }
}

/// Aggregate fare distribution for one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub sample_size: usize,
    pub median: Decimal,
    pub q1: Decimal,
    pub q3: Decimal,
    pub iqr: Decimal,
    pub mean: Decimal,
    pub min: u64,
    pub max: u64,
    pub std_dev: f64,
    /// Slot holding the cheapest fare in the bucket
    pub cheapest_slot: SlotId,
}

impl PriceStatistics {
    /// Build statistics from (slot, price) samples; `None` for an empty bucket
    pub fn from_samples(samples: &[(SlotId, u64)]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<&(SlotId, u64)> = samples.iter().collect();
        sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let prices: Vec<Decimal> = sorted.iter().map(|(_, p)| Decimal::from(*p)).collect();
        let n = prices.len();

        let q1 = percentile_cont(&prices, dec!(0.25))?.trunc();
        let median = percentile_cont(&prices, dec!(0.5))?.trunc();
        let q3 = percentile_cont(&prices, dec!(0.75))?.trunc();

        let sum: Decimal = prices.iter().sum();
        let mean = (sum / Decimal::from(n as u64))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        Some(Self {
            sample_size: n,
            median,
            q1,
            q3,
            iqr: q3 - q1,
            mean,
            min: sorted[0].1,
            max: sorted[n - 1].1,
            std_dev: sample_std_dev(samples.iter().map(|(_, p)| *p)),
            cheapest_slot: sorted[0].0.clone(),
        })
    }

    pub fn is_trusted(&self) -> bool {
        self.sample_size >= MIN_TRUSTED_SAMPLES
    }
}

/// Continuous percentile over ascending values, `p` in `[0, 1]`
pub fn percentile_cont(sorted: &[Decimal], p: Decimal) -> Option<Decimal> {
    if sorted.is_empty() || p < Decimal::ZERO || p > Decimal::ONE {
        return None;
    }
    let position = p * Decimal::from((sorted.len() - 1) as u64);
    let lower = position.floor();
    let fraction = position - lower;
    let index = lower.to_usize()?;

    let low = sorted[index];
    match sorted.get(index + 1) {
        Some(high) if !fraction.is_zero() => Some(low + (*high - low) * fraction),
        _ => Some(low),
    }
}

fn sample_std_dev(prices: impl Iterator<Item = u64>) -> f64 {
    let values: Vec<f64> = prices.map(|p| p as f64).collect();
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
