//! Scrape task scheduling: route generation, the work queue and the cycle driver

pub mod cycle;
pub mod queue;
pub mod routes;

pub use cycle::{format_lap_time, CycleReport, SchedulerConfig, ScrapeScheduler, TaskOutcome};
pub use queue::{TaskQueue, Ticket};
pub use routes::{calendar_dates, create_routes, CALENDAR_ANCHOR_DAY};
