//! Store Traits
//!
//! Narrow contracts for the flight calendar and the token store. Each call
//! is individually atomic; callers never hold a lock across calls.

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use types::{BearerToken, FlightObservation, MonthKey, PriceStatistics, Route, SlotId, StatsKey};

/// Error types for store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Result of persisting one observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub slot_id: SlotId,
    /// A new (slot, class, price) entry was recorded
    pub did_change: bool,
}

/// Persistent flight calendar with price history and bucket statistics
#[async_trait]
pub trait FlightStore: Send + Sync + Debug {
    /// Insert or update the observation's calendar slot
    ///
    /// Inactive observations only mark an existing slot unavailable.
    async fn upsert_observation(&self, observation: &FlightObservation) -> Result<UpsertOutcome>;

    /// Statistics from the last bulk recompute, if the bucket had enough samples
    async fn get_price_stats(&self, key: &StatsKey) -> Result<Option<PriceStatistics>>;

    /// Lowest available price for the route, month and class
    ///
    /// `exclude` leaves one slot out, so a freshly upserted observation can
    /// be compared against every other slot of its month.
    async fn get_min_price(
        &self,
        route: &Route,
        month: MonthKey,
        class: &str,
        exclude: Option<&SlotId>,
    ) -> Result<Option<u64>>;

    /// Rebuild every statistics bucket from the available slots; returns the bucket count
    async fn bulk_recompute_stats(&self) -> Result<usize>;

    /// Whether a deal for this slot and price already went out on `channel`
    async fn was_notified(&self, slot_id: &SlotId, price: u64, channel: &str) -> Result<bool>;

    async fn mark_notified(&self, slot_id: &SlotId, price: u64, channel: &str) -> Result<()>;
}

/// Document store of provider credentials
#[async_trait]
pub trait TokenStore: Send + Sync + Debug {
    /// Every token still flagged valid
    async fn list_active(&self) -> Result<Vec<BearerToken>>;

    async fn insert(&self, token: BearerToken) -> Result<()>;

    /// One-way transition; an invalidated token never becomes valid again
    async fn invalidate(&self, value: &str) -> Result<()>;

    /// Whether the credential was ever stored, valid or not
    async fn exists(&self, value: &str) -> Result<bool>;
}
