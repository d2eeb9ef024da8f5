//! Periodic statistics recompute

use config::{log_critical, log_metrics};
use state_flights::{FlightStore, StoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct StatsJob {
    store: Arc<dyn FlightStore>,
    interval: Duration,
}

impl StatsJob {
    pub fn new(store: Arc<dyn FlightStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Rebuild all buckets once; returns how many were written
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        let started = Instant::now();
        let buckets = self.store.bulk_recompute_stats().await?;
        log_metrics!(
            "New flight stats recorded: {} buckets in {:?}",
            buckets,
            started.elapsed()
        );
        Ok(buckets)
    }

    /// Recompute now and then every interval
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), StoreError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.run_once().await {
                log_critical!("Statistics recompute failed: {}", e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use state_flights::InMemoryFlightStore;
    use types::{FareOffer, FlightObservation, Itinerary, MonthKey, Route, StatsKey};

    fn priced(day: u32, price: u64) -> FlightObservation {
        let departure = NaiveDate::from_ymd_opt(2025, 8, day)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        FlightObservation {
            provider: "AerolineasARG".into(),
            airline: "AR".into(),
            route: Route::parse("AEP", "MDZ").unwrap(),
            departure,
            itinerary: Some(Itinerary {
                arrival: departure,
                duration_minutes: 110,
                has_layover: false,
                legs: vec![],
                offers: vec![FareOffer {
                    class: "Economy".into(),
                    seats_available: None,
                    price,
                }],
            }),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_recomputes_until_cancelled() {
        let store = Arc::new(InMemoryFlightStore::new());
        for (day, price) in [(1, 100), (2, 200), (3, 300), (4, 400)] {
            store.upsert_observation(&priced(day, price)).await.unwrap();
        }

        let job = StatsJob::new(store.clone(), Duration::from_secs(3_600));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { job.run(cancel).await }
        });

        // The first tick fires immediately
        tokio::time::sleep(Duration::from_secs(1)).await;
        let key = StatsKey::new(
            Route::parse("AEP", "MDZ").unwrap(),
            "Economy",
            MonthKey::new(2025, 8).unwrap(),
        );
        let stats = store.get_price_stats(&key).await.unwrap().unwrap();
        assert_eq!(stats.sample_size, 4);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
