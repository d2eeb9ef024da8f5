//! # Fare Monitor Types Library
//!
//! Shared domain model for the fare monitor services.
//!
//! ## Design Philosophy
//!
//! - **Validated Identifiers**: IATA codes and routes can only be built in a valid state
//! - **Reproducible Identity**: a calendar slot's id is a hash of its own fields
//! - **No Float Money**: fares are whole currency units, statistics use `Decimal`
//! - **Explicit Availability**: an observation without an itinerary is an inactive slot
//!
//! ## Integration Points
//!
//! - **Scraper**: builds [`FlightObservation`]s and [`CalendarBatch`]es from provider payloads
//! - **Flight Store**: keys rows by [`SlotId`], aggregates [`PriceStatistics`] per [`StatsKey`]
//! - **Deal Engine**: emits an [`AlertSet`], wrapped in an [`AlertContext`] for dispatch
//! - **Token Lifecycle**: tracks provider credentials as [`BearerToken`]s

pub mod alerts;
pub mod common;
pub mod flights;
pub mod stats;
pub mod tokens;

pub use alerts::{AlertContext, AlertSet, DealLevel, DistributionDeal, MonthlyLow};
pub use common::{IataCode, MonthKey, Route, SlotId, ValidationError};
pub use flights::{CalendarBatch, FareOffer, FlightLeg, FlightObservation, Itinerary, ScrapeTask};
pub use stats::{percentile_cont, PriceStatistics, StatsKey, MIN_TRUSTED_SAMPLES};
pub use tokens::BearerToken;
