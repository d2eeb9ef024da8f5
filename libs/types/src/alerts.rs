//! Deal alert records produced by the analysis engine

use crate::common::{IataCode, SlotId};
use crate::flights::FlightObservation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Strength of a distribution-based deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealLevel {
    Extreme,
    Deal,
}

impl DealLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealLevel::Extreme => "extreme",
            DealLevel::Deal => "deal",
        }
    }
}

/// Active result of the quartile check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionDeal {
    pub level: DealLevel,
    pub price: u64,
    pub q1: Decimal,
    pub q3: Decimal,
    pub iqr: Decimal,
    /// `q1 - extreme_threshold_factor * iqr`, truncated; informational for `Deal`
    pub threshold: Decimal,
    pub percentage_off: Decimal,
    pub description: String,
}

/// Active result of the monthly minimum check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyLow {
    pub price: u64,
    pub monthly_min_price: u64,
    pub description: String,
}

/// Both check results for one observation; `None` means inactive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSet {
    pub extreme_deal: Option<DistributionDeal>,
    pub lowest_price_month: Option<MonthlyLow>,
}

impl AlertSet {
    pub const EXTREME_DEAL: &'static str = "extreme_deal";
    pub const LOWEST_PRICE_MONTH: &'static str = "lowest_price_month";

    pub fn any_active(&self) -> bool {
        self.extreme_deal.is_some() || self.lowest_price_month.is_some()
    }

    /// Names of the checks that fired, in a stable order
    pub fn active_checks(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(2);
        if self.extreme_deal.is_some() {
            names.push(Self::EXTREME_DEAL);
        }
        if self.lowest_price_month.is_some() {
            names.push(Self::LOWEST_PRICE_MONTH);
        }
        names
    }
}

/// Enriched record handed to the notification side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertContext {
    pub provider: String,
    pub slot_id: SlotId,
    pub flight: FlightObservation,
    pub alerts: AlertSet,
}

impl AlertContext {
    pub fn origin(&self) -> &IataCode {
        self.flight.route.origin()
    }

    /// Price the alerts were raised for
    pub fn price(&self) -> Option<u64> {
        self.flight.primary_offer().map(|offer| offer.price)
    }
}
