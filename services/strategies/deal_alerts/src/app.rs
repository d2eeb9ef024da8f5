//! Wiring of the whole monitor into one process

use crate::analyzer::DealAnalyzer;
use crate::consumer::CalendarConsumer;
use crate::dispatch::DealDispatcher;
use crate::notifier::DealNotifier;
use crate::settings::PipelineConfig;
use crate::stats_job::StatsJob;
use crate::supervisor::Supervisor;
use adapter_service::{
    FinderTiming, FlightProvider, LoaderTiming, PoolLoader, ProbeGenerator, ProviderClient,
    RequestQuota, SchedulerConfig, ScrapeScheduler, TokenFinder, TokenPool, TokenValidator,
    ValidatorTiming,
};
use anyhow::{Context, Result};
use config::{log_success, MonitorSettings, NotificationSettings};
use message_sink::sinks::webhook::WebhookRoutes;
use message_sink::{LogNotifier, MemoryBroker, NotificationSink, WebhookNotifier};
use state_flights::{InMemoryFlightStore, InMemoryTokenStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Webhooks when any are configured, otherwise the tracing log
pub fn build_notifier(
    notifications: &NotificationSettings,
    timeout: Duration,
) -> Result<Arc<dyn NotificationSink>> {
    let configured = notifications.admin_webhook.is_some()
        || notifications.default_webhook.is_some()
        || !notifications.deal_webhooks.is_empty();
    if !configured {
        info!("No webhooks configured, notifications go to the log");
        return Ok(Arc::new(LogNotifier));
    }

    let routes = WebhookRoutes {
        admin: notifications.admin_webhook.clone(),
        default_deals: notifications.default_webhook.clone(),
        deals_by_origin: notifications.deal_webhooks.clone(),
    };
    let notifier = WebhookNotifier::new(routes, timeout).context("Failed to build webhook notifier")?;
    Ok(Arc::new(notifier))
}

/// Start every component and run until cancelled or one of them fails
pub async fn run_monitor(
    settings: &MonitorSettings,
    operator: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
) -> Result<()> {
    let pipeline = PipelineConfig::from_settings(settings).context("Invalid deal settings")?;

    let broker = Arc::new(MemoryBroker::new());
    let flights = Arc::new(InMemoryFlightStore::new());
    let tokens = Arc::new(InMemoryTokenStore::new());
    let provider: Arc<dyn FlightProvider> = Arc::new(
        ProviderClient::new(settings.provider.clone()).context("Failed to build provider client")?,
    );
    let pool = TokenPool::new();
    let probes = ProbeGenerator::from_settings(&settings.airports, settings.tokens.probe_window_days)
        .context("Invalid airport configuration")?;

    let finder = TokenFinder::new(
        Arc::clone(&provider),
        tokens.clone(),
        probes.clone(),
        FinderTiming {
            duplicate_backoff: settings.tokens.duplicate_backoff(),
            error_delay: settings.tokens.error_delay(),
        },
    );
    let validator = Arc::new(TokenValidator::new(
        Arc::clone(&provider),
        tokens.clone(),
        probes,
        ValidatorTiming {
            interval: settings.tokens.validation_interval(),
            max_retries: settings.tokens.max_retries,
            error_delay: settings.tokens.error_delay(),
        },
    ));
    let loader = PoolLoader::new(
        tokens,
        pool.clone(),
        LoaderTiming {
            refresh_interval: settings.tokens.refresh_interval(),
            empty_interval: settings.tokens.validation_interval(),
        },
    );
    let scheduler = ScrapeScheduler::new(
        SchedulerConfig::from_settings(settings),
        provider,
        pool,
        broker.clone(),
        RequestQuota::per_minute(settings.scraper.requests_per_minute),
    );

    let analyzer = DealAnalyzer::new(flights.clone(), pipeline.deals.clone());
    let dispatcher = DealDispatcher::new(broker.clone(), pipeline.alerts.name.clone(), pipeline.provider.clone());
    let consumer = Arc::new(CalendarConsumer::new(flights.clone(), analyzer, dispatcher));
    let notifier = Arc::new(DealNotifier::new(flights.clone(), Arc::clone(&operator)));
    let stats = StatsJob::new(flights, pipeline.stats_interval);

    let mut supervisor = Supervisor::new(cancel);

    let token = supervisor.token();
    supervisor.spawn("token finder", async move { finder.run(token).await });
    let token = supervisor.token();
    supervisor.spawn("token validator", validator.run(token));
    let token = supervisor.token();
    supervisor.spawn("token loader", async move { loader.run(token).await });
    let token = supervisor.token();
    supervisor.spawn("scrape scheduler", async move { scheduler.run(token).await });
    let token = supervisor.token();
    supervisor.spawn("stats updater", async move { stats.run(token).await });

    let source = broker.clone();
    let topic = pipeline.calendar.clone();
    supervisor.spawn_until_closed("calendar consumer", async move { consumer.run(source.as_ref(), &topic).await });
    let source = broker.clone();
    let topic = pipeline.alerts.clone();
    supervisor.spawn_until_closed("deal notifier", async move { notifier.run(source.as_ref(), &topic).await });

    // Consumers drain their queues and return once the broker closes
    let closer = tokio::spawn({
        let token = supervisor.token();
        let broker = Arc::clone(&broker);
        async move {
            token.cancelled().await;
            info!("Closing message broker");
            broker.shutdown();
        }
    });

    log_success!("Fare monitor started with {} components", supervisor.len());
    let outcome = supervisor.wait(operator.as_ref()).await;
    closer.abort();
    outcome?;
    info!("Fare monitor stopped");
    Ok(())
}
