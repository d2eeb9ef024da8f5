//! Scrape cycle driver
//!
//! One cycle: build routes × dates, enqueue every task, run a fixed number
//! of workers until the queue's completion barrier releases, then cancel the
//! workers and start over.

use crate::client::FlightProvider;
use crate::error::WorkerError;
use crate::rate_limit::RequestQuota;
use crate::scheduler::queue::TaskQueue;
use crate::scheduler::routes::{calendar_dates, create_routes};
use crate::tokens::TokenPool;
use chrono::{Local, NaiveDate};
use config::{log_critical, log_cycle, log_error, log_metrics, log_success, AirportSettings, MonitorSettings};
use message_sink::{publish_json, MessageSink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use types::ScrapeTask;

/// Scheduler knobs, usually taken from [`MonitorSettings`]
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_workers: usize,
    pub request_permits: usize,
    pub max_month_scraping: u32,
    pub error_delay: Duration,
    pub calendar_topic: String,
    pub airports: AirportSettings,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            max_workers: settings.scraper.max_workers,
            request_permits: settings.scraper.request_permits(),
            max_month_scraping: settings.scraper.max_month_scraping,
            error_delay: settings.scraper.error_delay(),
            calendar_topic: settings.topics.calendar.name.clone(),
            airports: settings.airports.clone(),
        }
    }
}

/// What happened to one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Batch published with this many observations
    Published(usize),
    /// Provider returned no calendar slots
    Empty,
    /// Recoverable failure, task dropped for this cycle
    Skipped,
}

#[derive(Debug, Default)]
struct CycleCounters {
    published: AtomicUsize,
    empty: AtomicUsize,
    skipped: AtomicUsize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub tasks: usize,
    pub published: usize,
    pub empty: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Shared by every worker of every cycle
struct WorkerContext {
    provider: Arc<dyn FlightProvider>,
    pool: TokenPool,
    sink: Arc<dyn MessageSink>,
    permits: Semaphore,
    quota: RequestQuota,
    error_delay: Duration,
    topic: String,
}

impl WorkerContext {
    /// Scrape one task: token, permit, request, publish, then the fixed delay
    async fn process(&self, task: &ScrapeTask) -> Result<TaskOutcome, WorkerError> {
        let token = self.pool.wait_any().await;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| WorkerError::Aborted(e.to_string()))?;
        self.quota.until_ready().await;

        let outcome = match self.provider.fetch_calendar(task, &token).await {
            Ok(batch) if batch.is_empty() => Ok(TaskOutcome::Empty),
            Ok(batch) => {
                let origin = task.route.origin().as_str();
                match publish_json(self.sink.as_ref(), &self.topic, Some(origin), &batch).await {
                    Ok(()) => Ok(TaskOutcome::Published(batch.observations.len())),
                    Err(e) => Err(WorkerError::from(e)),
                }
            }
            Err(e) if e.is_task_recoverable() => {
                log_error!("Error scraping calendar {} | {}: {}", task, e.kind(), e);
                Ok(TaskOutcome::Skipped)
            }
            Err(e) => Err(WorkerError::from(e)),
        };

        // Throttle regardless of outcome, still holding the request permit
        tokio::time::sleep(self.error_delay).await;
        outcome
    }
}

async fn worker_loop(
    id: usize,
    ctx: Arc<WorkerContext>,
    queue: Arc<TaskQueue<ScrapeTask>>,
    counters: Arc<CycleCounters>,
    cancel: CancellationToken,
) -> Result<(), WorkerError> {
    loop {
        let ticket = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            ticket = queue.get() => ticket,
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            outcome = ctx.process(&ticket) => outcome,
        };

        match outcome {
            Ok(TaskOutcome::Published(count)) => {
                counters.published.fetch_add(1, Ordering::Relaxed);
                debug!("[Worker {}] Finished {} ({} slots)", id, *ticket, count);
            }
            Ok(TaskOutcome::Empty) => {
                counters.empty.fetch_add(1, Ordering::Relaxed);
                debug!("[Worker {}] No calendar slots for {}", id, *ticket);
            }
            Ok(TaskOutcome::Skipped) => {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                log_critical!("[Worker {}] Failed task {}: {}", id, *ticket, e);
                return Err(e);
            }
        }
        // Dropping the ticket acknowledges the task
    }
}

pub struct ScrapeScheduler {
    ctx: Arc<WorkerContext>,
    config: SchedulerConfig,
}

impl ScrapeScheduler {
    pub fn new(
        config: SchedulerConfig,
        provider: Arc<dyn FlightProvider>,
        pool: TokenPool,
        sink: Arc<dyn MessageSink>,
        quota: RequestQuota,
    ) -> Self {
        let ctx = WorkerContext {
            provider,
            pool,
            sink,
            permits: Semaphore::new(config.request_permits.max(1)),
            quota,
            error_delay: config.error_delay,
            topic: config.calendar_topic.clone(),
        };
        Self {
            ctx: Arc::new(ctx),
            config,
        }
    }

    /// Scrape every route × date once; a fatal task failure aborts the cycle
    pub async fn run_cycle(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, WorkerError> {
        let started = Instant::now();
        let routes = create_routes(&self.config.airports)?;
        let dates = calendar_dates(today, self.config.max_month_scraping);

        let queue = Arc::new(TaskQueue::new());
        for route in &routes {
            for date in &dates {
                queue.put(ScrapeTask::new(route.clone(), *date));
            }
        }
        let tasks = queue.unfinished();
        info!(
            "Enqueued {} tasks | Routes: {} - Months: {}",
            tasks,
            routes.len(),
            dates.len()
        );

        let counters = Arc::new(CycleCounters::default());
        let workers_cancel = cancel.child_token();
        let mut workers = JoinSet::new();
        for id in 0..self.config.max_workers.max(1) {
            workers.spawn(worker_loop(
                id,
                Arc::clone(&self.ctx),
                Arc::clone(&queue),
                Arc::clone(&counters),
                workers_cancel.clone(),
            ));
        }
        info!("Started {} workers", self.config.max_workers);

        let result = loop {
            tokio::select! {
                _ = queue.join() => break Ok(()),
                _ = cancel.cancelled() => break Ok(()),
                Some(joined) = workers.join_next() => match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => break Err(e),
                    Err(e) => break Err(WorkerError::Aborted(e.to_string())),
                },
            }
        };

        workers_cancel.cancel();
        while workers.join_next().await.is_some() {}
        info!("All workers completed");
        result?;

        Ok(CycleReport {
            tasks,
            published: counters.published.load(Ordering::Relaxed),
            empty: counters.empty.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        })
    }

    /// Cycle forever; returns on cancellation or the first fatal failure
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), WorkerError> {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = self.ctx.pool.wait_any() => {}
        }
        log_success!("Valid bearer token loaded, starting scrape cycles");

        while !cancel.is_cancelled() {
            let report = self.run_cycle(Local::now().date_naive(), &cancel).await?;
            log_metrics!(
                "Cycle tasks: {} | published: {} | empty: {} | skipped: {}",
                report.tasks,
                report.published,
                report.empty,
                report.skipped
            );
            log_cycle!(
                "Finished cycle, restarting | Lap time: {}",
                format_lap_time(report.elapsed)
            );
        }
        Ok(())
    }
}

/// `"{h}h {m}m {s.sss}s"`
pub fn format_lap_time(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    let hours = (total / 3600.0).floor();
    let minutes = ((total - hours * 3600.0) / 60.0).floor();
    let seconds = total - hours * 3600.0 - minutes * 60.0;
    format!("{}h {}m {:.3}s", hours as u64, minutes as u64, seconds)
}
