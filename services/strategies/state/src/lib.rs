//! # Flight State - Calendar and Credential Stores
//!
//! ## Purpose
//!
//! Storage contracts the fare monitor pipeline reads and writes through,
//! plus in-memory implementations used by the single-process deployment
//! and by tests.
//!
//! ## Integration Points
//!
//! - **Calendar consumer**: [`FlightStore::upsert_observation`] per parsed slot
//! - **Deal engine**: [`FlightStore::get_price_stats`] and [`FlightStore::get_min_price`]
//! - **Stats job**: [`FlightStore::bulk_recompute_stats`] on a fixed interval
//! - **Notifier**: delivery ledger via `was_notified` / `mark_notified`
//! - **Token lifecycle**: [`TokenStore`] shared by finder, validator and pool loader
//!
//! ## Architecture Role
//!
//! ```text
//! Scraper → [Calendar Topic] → Consumer → [FlightStore] ← Stats Job
//!                                              ↓
//!                                         Deal Engine → [Alerts Topic] → Notifier
//!
//! Finder / Validator → [TokenStore] → Pool Loader → Token Pool
//! ```
//!
//! Statistics are rebuilt out-of-band, so the deal engine may compare a new
//! price against slightly stale buckets.

pub mod flights;
pub mod tokens;
pub mod traits;

pub use flights::{CalendarSlot, InMemoryFlightStore};
pub use tokens::InMemoryTokenStore;
pub use traits::{FlightStore, Result, StoreError, TokenStore, UpsertOutcome};
