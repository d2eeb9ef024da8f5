//! # Deal Analysis Engine
//!
//! ## Purpose
//!
//! Scores a freshly persisted observation against its bucket's fare
//! distribution (route, fare class, departure month) and against the lowest
//! fare currently known for that month.
//!
//! ## Checks
//!
//! - **Distribution** (`extreme_deal`): quartile/IQR classification into
//!   extreme, deal or inactive. Skipped while the bucket has too few samples,
//!   and when the price is far above the month's real minimum (statistics lag
//!   the calendar, so a stale q1 would otherwise flag ordinary fares).
//! - **Monthly low** (`lowest_price_month`): price strictly below every
//!   other slot of the month. Ties never re-alert.
//!
//! Both checks read through [`FlightStore`]; the classification itself is the
//! pure function [`classify`], so identical inputs always yield the same tag.

use config::DealSettings;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use state_flights::{FlightStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use types::{
    AlertSet, DealLevel, DistributionDeal, FareOffer, FlightObservation, MonthlyLow, PriceStatistics,
    SlotId, StatsKey,
};

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Observation {slot_id} has no fare offers")]
    NoOffers { slot_id: SlotId },

    #[error("First quartile is zero, percentage off is undefined")]
    ZeroQuartile,

    #[error("Distribution check failed: {0}")]
    Distribution(#[source] StoreError),

    #[error("Monthly low check failed: {0}")]
    MonthlyLow(#[source] StoreError),
}

/// The part of a bucket's statistics the classifier looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: Decimal,
    pub q3: Decimal,
    pub iqr: Decimal,
}

impl From<&PriceStatistics> for Quartiles {
    fn from(stats: &PriceStatistics) -> Self {
        Self {
            q1: stats.q1,
            q3: stats.q3,
            iqr: stats.iqr,
        }
    }
}

enum Branch {
    Extreme,
    Deal,
    /// Deal in a bucket without spread
    Flat,
}

/// Classify `price` against a bucket's quartiles
///
/// `percentage_off` is rounded to two places with banker's rounding. The
/// threshold is only a decision input for the extreme branch; deal results
/// carry it for reference.
pub fn classify(
    price: u64,
    quartiles: Quartiles,
    deals: &DealSettings,
) -> Result<Option<DistributionDeal>, AnalysisError> {
    let Quartiles { q1, q3, iqr } = quartiles;
    if q1.is_zero() {
        return Err(AnalysisError::ZeroQuartile);
    }

    let fare = Decimal::from(price);
    let percentage_off = ((q1 - fare) / q1 * dec!(100)).round_dp(2);
    let threshold = q1 - deals.extreme_threshold_factor * iqr;
    let has_spread = iqr > Decimal::ZERO;

    let branch = if (has_spread && fare < threshold && percentage_off >= deals.extreme_min_percentage_off)
        || percentage_off >= deals.extreme_percentage_off_flat
    {
        Branch::Extreme
    } else if has_spread
        && fare < q1 * deals.deal_q1_discount_factor
        && percentage_off >= deals.deal_min_percentage_off
    {
        Branch::Deal
    } else if iqr.is_zero()
        && fare < q1 * deals.no_iqr_discount_factor
        && percentage_off >= deals.deal_min_percentage_off
    {
        Branch::Flat
    } else {
        return Ok(None);
    };

    let (level, description) = match branch {
        Branch::Extreme => (
            DealLevel::Extreme,
            format!(
                "New extremely low price: ${}. Usually above ${}. Approximate savings: {}%.",
                price, q1, percentage_off
            ),
        ),
        Branch::Deal => (
            DealLevel::Deal,
            format!(
                "New low price: ${}. Reference price: ${}. Estimated savings: {}%.",
                price, q1, percentage_off
            ),
        ),
        Branch::Flat => (
            DealLevel::Deal,
            format!(
                "New standout price: ${}. Usual price: ${}. Approximate savings: {}%.",
                price, q1, percentage_off
            ),
        ),
    };

    Ok(Some(DistributionDeal {
        level,
        price,
        q1,
        q3,
        iqr,
        threshold: threshold.trunc(),
        percentage_off,
        description,
    }))
}

/// Monthly-low check on an already known minimum
pub fn monthly_low(price: u64, known_min: Option<u64>) -> Option<MonthlyLow> {
    let monthly_min_price = known_min.filter(|min| price < *min)?;
    Some(MonthlyLow {
        price,
        monthly_min_price,
        description: format!(
            "New monthly minimum price: ${}. Previous minimum: ${}.",
            price, monthly_min_price
        ),
    })
}

#[derive(Debug, Clone)]
pub struct DealAnalyzer {
    store: Arc<dyn FlightStore>,
    deals: DealSettings,
}

impl DealAnalyzer {
    pub fn new(store: Arc<dyn FlightStore>, deals: DealSettings) -> Self {
        Self { store, deals }
    }

    /// Run both checks for an observation stored under `slot_id`
    pub async fn analyze(
        &self,
        observation: &FlightObservation,
        slot_id: &SlotId,
    ) -> Result<AlertSet, AnalysisError> {
        let offer = observation
            .primary_offer()
            .ok_or_else(|| AnalysisError::NoOffers {
                slot_id: slot_id.clone(),
            })?;

        let extreme_deal = self.check_distribution(observation, offer, slot_id).await?;
        let lowest_price_month = self.check_monthly_low(observation, offer, slot_id).await?;

        let alerts = AlertSet {
            extreme_deal,
            lowest_price_month,
        };
        debug!(
            "Analyzed {} {} at ${}: {:?}",
            observation.route,
            observation.departure_date(),
            offer.price,
            alerts.active_checks()
        );
        Ok(alerts)
    }

    async fn check_distribution(
        &self,
        observation: &FlightObservation,
        offer: &FareOffer,
        slot_id: &SlotId,
    ) -> Result<Option<DistributionDeal>, AnalysisError> {
        let key = StatsKey::new(observation.route.clone(), offer.class.clone(), observation.month());
        let stats = self
            .store
            .get_price_stats(&key)
            .await
            .map_err(AnalysisError::Distribution)?;
        let Some(stats) = stats.filter(PriceStatistics::is_trusted) else {
            return Ok(None);
        };

        let known_min = self
            .store
            .get_min_price(&observation.route, observation.month(), &offer.class, Some(slot_id))
            .await
            .map_err(AnalysisError::Distribution)?;
        if let Some(min) = known_min {
            if Decimal::from(offer.price) > Decimal::from(min) * self.deals.min_real_price_factor {
                return Ok(None);
            }
        }

        classify(offer.price, Quartiles::from(&stats), &self.deals)
    }

    async fn check_monthly_low(
        &self,
        observation: &FlightObservation,
        offer: &FareOffer,
        slot_id: &SlotId,
    ) -> Result<Option<MonthlyLow>, AnalysisError> {
        let known_min = self
            .store
            .get_min_price(&observation.route, observation.month(), &offer.class, Some(slot_id))
            .await
            .map_err(AnalysisError::MonthlyLow)?;
        Ok(monthly_low(offer.price, known_min))
    }
}
