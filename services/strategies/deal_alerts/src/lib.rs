//! # Deal Alerts Strategy
//!
//! ## Purpose
//!
//! Turns scraped fare calendars into deal notifications. Sits downstream of
//! the provider adapter on the calendar topic and upstream of the operator
//! channels.
//!
//! ## Architecture Role
//!
//! ```text
//! calendar topic → CalendarConsumer → FlightStore.upsert
//!                        │ did_change
//!                        ▼
//!                  DealAnalyzer (quartiles + monthly low)
//!                        │ any active
//!                        ▼
//!                  DealDispatcher → alerts topic → DealNotifier → NotificationSink
//!
//! StatsJob ── bulk_recompute_stats every interval ──▶ FlightStore
//! ```
//!
//! [`app::run_monitor`] wires these together with the adapter's token
//! workers and scrape scheduler under one [`Supervisor`].

pub mod analyzer;
pub mod app;
pub mod consumer;
pub mod dispatch;
pub mod notifier;
pub mod settings;
pub mod stats_job;
pub mod supervisor;

pub use analyzer::{classify, monthly_low, AnalysisError, DealAnalyzer, Quartiles};
pub use consumer::{BatchSummary, CalendarConsumer, ConsumerError, ObservationOutcome};
pub use dispatch::DealDispatcher;
pub use notifier::{DealNotifier, Delivery, NotifyError};
pub use settings::{PipelineConfig, PipelineConfigError};
pub use stats_job::StatsJob;
pub use supervisor::{ComponentFailure, Supervisor};
