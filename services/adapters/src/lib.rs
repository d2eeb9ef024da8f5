//! # Fare Monitor Provider Adapter
//!
//! ## Purpose
//!
//! Collects flex-dates fare calendars from the airline provider and turns them
//! into [`types::CalendarBatch`] messages on the calendar topic. Also owns the
//! provider credential lifecycle, since every calendar request needs a live
//! bearer token.
//!
//! ## Integration Points
//!
//! - **Provider**: [`FlightProvider`] over HTTP, implemented by [`ProviderClient`]
//! - **Token Store**: [`state_flights::TokenStore`] holds discovered credentials
//! - **Calendar Topic**: batches published through [`message_sink::MessageSink`], keyed by origin
//! - **Configuration**: [`config::MonitorSettings`] provider, scraper and token sections
//!
//! ## Architecture Role
//!
//! ```text
//! TokenFinder ──insert──▶ TokenStore ◀──invalidate── TokenValidator
//!                             │
//!                        PoolLoader
//!                             ▼
//!                         TokenPool ──wait_any──▶ ScrapeScheduler workers
//!                                                     │ fetch_calendar
//!                                                     ▼
//!                                               calendar topic
//! ```
//!
//! ## Failure Model
//!
//! Provider responses are classified into [`ScrapeError`] kinds. Recoverable
//! kinds skip a single task; anything else surfaces as a [`WorkerError`] and
//! stops the loop that hit it, so the supervising process can alert and exit.

pub mod classify;
pub mod client;
pub mod error;
pub mod parser;
pub mod rate_limit;
pub mod scheduler;
pub mod tokens;

pub use classify::classify_response;
pub use client::{FlightProvider, ProviderClient};
pub use error::{ParseError, Result, ScrapeError, WorkerError};
pub use parser::{parse_access_token, parse_calendar};
pub use rate_limit::RequestQuota;
pub use scheduler::{
    calendar_dates, create_routes, format_lap_time, CycleReport, SchedulerConfig,
    ScrapeScheduler, TaskQueue,
};
pub use tokens::{
    FinderOutcome, FinderTiming, LoaderTiming, PoolLoader, ProbeGenerator, TokenFinder,
    TokenPool, TokenValidator, ValidatorTiming, Verdict,
};
