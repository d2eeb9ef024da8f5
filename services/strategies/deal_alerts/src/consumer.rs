//! # Calendar Consumer
//!
//! ## Purpose
//!
//! Drains the calendar topic. Every observation of a batch is upserted into
//! the flight store; when the upsert recorded a new price the observation is
//! analyzed and any active alerts are dispatched to the notifier topic.
//!
//! ## Failure Model
//!
//! A store or analysis failure only loses that observation and is logged as
//! critical. A publish failure on the alerts topic fails the batch, which ends
//! the consume loop. Payloads that are not calendar batches are skipped.

use crate::analyzer::{AnalysisError, DealAnalyzer};
use crate::dispatch::DealDispatcher;
use config::{log_critical, TopicConfig};
use futures::future::join_all;
use message_sink::{consume, HandlerError, Message, MessageSource, SinkError};
use state_flights::{FlightStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use types::{CalendarBatch, FlightObservation};

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("Failed to save observation: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Failed to publish alert: {0}")]
    Publish(#[from] SinkError),
}

/// What happened to one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationOutcome {
    /// Upsert recorded no new price
    Unchanged,
    /// New price, no check fired
    Analyzed,
    /// New price and an alert went out
    Alerted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub observations: usize,
    pub changed: usize,
    pub alerted: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct CalendarConsumer {
    store: Arc<dyn FlightStore>,
    analyzer: DealAnalyzer,
    dispatcher: DealDispatcher,
}

impl CalendarConsumer {
    pub fn new(store: Arc<dyn FlightStore>, analyzer: DealAnalyzer, dispatcher: DealDispatcher) -> Self {
        Self {
            store,
            analyzer,
            dispatcher,
        }
    }

    /// Upsert, analyze on change, dispatch
    pub async fn process_observation(
        &self,
        observation: &FlightObservation,
    ) -> Result<ObservationOutcome, ConsumerError> {
        let outcome = self.store.upsert_observation(observation).await?;
        if !outcome.did_change {
            return Ok(ObservationOutcome::Unchanged);
        }

        let alerts = self.analyzer.analyze(observation, &outcome.slot_id).await?;
        if self.dispatcher.dispatch(observation, outcome.slot_id, alerts).await? {
            Ok(ObservationOutcome::Alerted)
        } else {
            Ok(ObservationOutcome::Analyzed)
        }
    }

    /// Process every observation of `batch` concurrently
    ///
    /// Observations are isolated from each other: a store or analysis failure
    /// loses only that observation, is logged as critical and counted in
    /// [`BatchSummary::failed`]. Only an alert publish failure fails the batch.
    pub async fn handle_batch(&self, batch: &CalendarBatch) -> Result<BatchSummary, ConsumerError> {
        let results = join_all(batch.observations.iter().map(|o| self.process_observation(o))).await;

        let mut summary = BatchSummary {
            observations: batch.observations.len(),
            ..BatchSummary::default()
        };
        for (observation, result) in batch.observations.iter().zip(results) {
            match result {
                Ok(ObservationOutcome::Unchanged) => {}
                Ok(ObservationOutcome::Analyzed) => summary.changed += 1,
                Ok(ObservationOutcome::Alerted) => {
                    summary.changed += 1;
                    summary.alerted += 1;
                }
                Err(ConsumerError::Publish(e)) => return Err(ConsumerError::Publish(e)),
                Err(e) => {
                    summary.failed += 1;
                    log_critical!(
                        "Failed to check and save {} {}: {}",
                        observation.route,
                        observation.departure_date(),
                        e
                    );
                }
            }
        }

        debug!(
            "Batch {} ({}): {} observations, {} changed, {} alerted, {} failed",
            batch.task, batch.provider, summary.observations, summary.changed, summary.alerted, summary.failed
        );
        Ok(summary)
    }

    /// Consume the calendar topic until it closes or a batch fails
    pub async fn run(self: Arc<Self>, source: &dyn MessageSource, topic: &TopicConfig) -> Result<(), SinkError> {
        info!("Consuming {} as {}", topic.name, topic.group_id);
        consume(source, &topic.name, &topic.group_id, topic.max_workers, move |message| {
            let consumer = Arc::clone(&self);
            async move { consumer.handle_message(message).await }
        })
        .await
    }

    async fn handle_message(&self, message: Message) -> Result<(), HandlerError> {
        let batch: CalendarBatch = match message.decode() {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Skipping message on {} that is not a calendar batch: {}", message.topic, e);
                return Ok(());
            }
        };
        self.handle_batch(&batch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use config::DealSettings;
    use message_sink::test_utils::CollectorSink;
    use state_flights::{InMemoryFlightStore, UpsertOutcome};
    use types::{FareOffer, Itinerary, MonthKey, PriceStatistics, Route, ScrapeTask, SlotId, StatsKey};

    /// Flight store whose writes fail for one departure day
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: InMemoryFlightStore,
        failing_day: u32,
    }

    #[async_trait]
    impl FlightStore for FlakyStore {
        async fn upsert_observation(&self, observation: &FlightObservation) -> Result<UpsertOutcome, StoreError> {
            use chrono::Datelike;
            if observation.departure_date().day() == self.failing_day {
                return Err(StoreError::Unavailable {
                    reason: "connection reset".into(),
                });
            }
            self.inner.upsert_observation(observation).await
        }

        async fn get_price_stats(&self, key: &StatsKey) -> Result<Option<PriceStatistics>, StoreError> {
            self.inner.get_price_stats(key).await
        }

        async fn get_min_price(
            &self,
            route: &Route,
            month: MonthKey,
            class: &str,
            exclude: Option<&SlotId>,
        ) -> Result<Option<u64>, StoreError> {
            self.inner.get_min_price(route, month, class, exclude).await
        }

        async fn bulk_recompute_stats(&self) -> Result<usize, StoreError> {
            self.inner.bulk_recompute_stats().await
        }

        async fn was_notified(&self, slot_id: &SlotId, price: u64, channel: &str) -> Result<bool, StoreError> {
            self.inner.was_notified(slot_id, price, channel).await
        }

        async fn mark_notified(&self, slot_id: &SlotId, price: u64, channel: &str) -> Result<(), StoreError> {
            self.inner.mark_notified(slot_id, price, channel).await
        }
    }

    fn priced(day: u32, price: u64) -> FlightObservation {
        let departure = NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap();
        FlightObservation {
            provider: "AerolineasARG".into(),
            airline: "AR".into(),
            route: Route::parse("EZE", "BRC").unwrap(),
            departure,
            itinerary: Some(Itinerary {
                arrival: departure,
                duration_minutes: 135,
                has_layover: false,
                legs: vec![],
                offers: vec![FareOffer {
                    class: "Economy".into(),
                    seats_available: Some(4),
                    price,
                }],
            }),
        }
    }

    #[tokio::test]
    async fn test_store_failure_only_loses_that_observation() {
        let store = Arc::new(FlakyStore {
            failing_day: 3,
            ..FlakyStore::default()
        });
        let sink = Arc::new(CollectorSink::new());
        let consumer = CalendarConsumer::new(
            store.clone(),
            DealAnalyzer::new(store.clone(), DealSettings::default()),
            DealDispatcher::new(sink, "alerts", "AerolineasARG"),
        );

        let batch = CalendarBatch {
            provider: "AerolineasARG".into(),
            task: ScrapeTask::new(
                Route::parse("EZE", "BRC").unwrap(),
                NaiveDate::from_ymd_opt(2025, 9, 16).unwrap(),
            ),
            shopping_id: None,
            observations: vec![priced(2, 900), priced(3, 800), priced(4, 950)],
        };

        let summary = consumer.handle_batch(&batch).await.unwrap();
        assert_eq!(summary.observations, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.changed, 2);
        assert_eq!(store.inner.slot_count(), 2);
    }
}
