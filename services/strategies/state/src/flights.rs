//! In-memory flight calendar
//!
//! Mirrors the relational layout the pipeline expects: one row per calendar
//! slot, an append-only price history keyed by (slot, class, price), a
//! statistics table rebuilt in bulk, and a ledger of sent notifications.

use crate::traits::{FlightStore, Result, UpsertOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use types::{
    FlightObservation, MonthKey, PriceStatistics, Route, SlotId, StatsKey, MIN_TRUSTED_SAMPLES,
};

/// Stored state of one calendar slot
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSlot {
    /// Last active observation seen for the slot
    pub observation: FlightObservation,
    pub class: String,
    pub price: u64,
    pub available: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Calendar {
    slots: HashMap<SlotId, CalendarSlot>,
    history: HashSet<(SlotId, String, u64)>,
}

#[derive(Debug, Default)]
pub struct InMemoryFlightStore {
    calendar: RwLock<Calendar>,
    stats: RwLock<HashMap<StatsKey, PriceStatistics>>,
    notifications: DashMap<(SlotId, u64, String), DateTime<Utc>>,
}

impl InMemoryFlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot_id: &SlotId) -> Option<CalendarSlot> {
        self.calendar.read().slots.get(slot_id).cloned()
    }

    pub fn slot_count(&self) -> usize {
        self.calendar.read().slots.len()
    }

    /// Price history entries recorded for a slot
    pub fn history_len(&self, slot_id: &SlotId) -> usize {
        self.calendar
            .read()
            .history
            .iter()
            .filter(|(slot, _, _)| slot == slot_id)
            .count()
    }
}

#[async_trait]
impl FlightStore for InMemoryFlightStore {
    async fn upsert_observation(&self, observation: &FlightObservation) -> Result<UpsertOutcome> {
        let slot_id = observation.slot_id();
        let now = Utc::now();
        let mut calendar = self.calendar.write();

        let Some(offer) = observation.primary_offer() else {
            if let Some(slot) = calendar.slots.get_mut(&slot_id) {
                if slot.available {
                    debug!("Slot {} ({}) no longer offered", slot_id, observation.route);
                }
                slot.available = false;
                slot.updated_at = now;
            }
            return Ok(UpsertOutcome {
                slot_id,
                did_change: false,
            });
        };

        let class = offer.class.clone();
        let price = offer.price;
        let entry = CalendarSlot {
            observation: observation.clone(),
            class: class.clone(),
            price,
            available: true,
            updated_at: now,
        };

        match calendar.slots.get_mut(&slot_id) {
            Some(existing) => {
                if existing.price != price || existing.class != class || !existing.available {
                    debug!(
                        "Slot {} updated: {} → {} ({})",
                        slot_id, existing.price, price, class
                    );
                }
                *existing = entry;
            }
            None => {
                calendar.slots.insert(slot_id.clone(), entry);
            }
        }

        let did_change = calendar.history.insert((slot_id.clone(), class, price));
        Ok(UpsertOutcome {
            slot_id,
            did_change,
        })
    }

    async fn get_price_stats(&self, key: &StatsKey) -> Result<Option<PriceStatistics>> {
        Ok(self.stats.read().get(key).cloned())
    }

    async fn get_min_price(
        &self,
        route: &Route,
        month: MonthKey,
        class: &str,
        exclude: Option<&SlotId>,
    ) -> Result<Option<u64>> {
        let calendar = self.calendar.read();
        let min = calendar
            .slots
            .iter()
            .filter(|(slot_id, slot)| {
                slot.available
                    && slot.class == class
                    && &slot.observation.route == route
                    && slot.observation.month() == month
                    && Some(*slot_id) != exclude
            })
            .map(|(_, slot)| slot.price)
            .min();
        Ok(min)
    }

    async fn bulk_recompute_stats(&self) -> Result<usize> {
        let mut buckets: HashMap<StatsKey, Vec<(SlotId, u64)>> = HashMap::new();
        {
            let calendar = self.calendar.read();
            for (slot_id, slot) in calendar.slots.iter().filter(|(_, s)| s.available) {
                let key = StatsKey::new(
                    slot.observation.route.clone(),
                    slot.class.clone(),
                    slot.observation.month(),
                );
                buckets
                    .entry(key)
                    .or_default()
                    .push((slot_id.clone(), slot.price));
            }
        }

        let rebuilt: HashMap<StatsKey, PriceStatistics> = buckets
            .into_iter()
            .filter(|(_, samples)| samples.len() >= MIN_TRUSTED_SAMPLES)
            .filter_map(|(key, samples)| {
                PriceStatistics::from_samples(&samples).map(|stats| (key, stats))
            })
            .collect();

        let count = rebuilt.len();
        *self.stats.write() = rebuilt;
        info!("Recomputed price statistics for {} buckets", count);
        Ok(count)
    }

    async fn was_notified(&self, slot_id: &SlotId, price: u64, channel: &str) -> Result<bool> {
        Ok(self
            .notifications
            .contains_key(&(slot_id.clone(), price, channel.to_string())))
    }

    async fn mark_notified(&self, slot_id: &SlotId, price: u64, channel: &str) -> Result<()> {
        self.notifications
            .entry((slot_id.clone(), price, channel.to_string()))
            .or_insert_with(Utc::now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use types::{FareOffer, Itinerary};

    fn observation(day: u32, price: u64) -> FlightObservation {
        let departure = NaiveDateTime::parse_from_str(
            &format!("2025-07-{:02}T21:45:00", day),
            "%Y-%m-%dT%H:%M:%S",
        )
        .unwrap();
        let mut obs = FlightObservation::inactive(
            "AerolineasARG",
            "AR",
            Route::parse("AEP", "COR").unwrap(),
            departure,
        );
        obs.itinerary = Some(Itinerary {
            arrival: departure + chrono::Duration::minutes(80),
            duration_minutes: 80,
            has_layover: false,
            legs: vec![],
            offers: vec![FareOffer {
                class: "Economy".into(),
                seats_available: Some(4),
                price,
            }],
        });
        obs
    }

    #[tokio::test]
    async fn test_repeated_upsert_is_idempotent() {
        let store = InMemoryFlightStore::new();
        let obs = observation(22, 500);

        let first = store.upsert_observation(&obs).await.unwrap();
        let second = store.upsert_observation(&obs).await.unwrap();

        assert!(first.did_change);
        assert!(!second.did_change);
        assert_eq!(first.slot_id, second.slot_id);
        assert_eq!(store.slot_count(), 1);
    }

    #[tokio::test]
    async fn test_price_change_records_history() {
        let store = InMemoryFlightStore::new();
        let slot = store.upsert_observation(&observation(22, 500)).await.unwrap().slot_id;

        assert!(store.upsert_observation(&observation(22, 450)).await.unwrap().did_change);
        // Returning to a known price is not a change
        assert!(!store.upsert_observation(&observation(22, 500)).await.unwrap().did_change);

        assert_eq!(store.history_len(&slot), 2);
        assert_eq!(store.slot(&slot).unwrap().price, 500);
    }

    #[tokio::test]
    async fn test_inactive_marks_slot_unavailable() {
        let store = InMemoryFlightStore::new();
        let active = observation(22, 500);
        let slot = store.upsert_observation(&active).await.unwrap().slot_id;

        let mut gone = active.clone();
        gone.itinerary = None;
        let outcome = store.upsert_observation(&gone).await.unwrap();

        assert!(!outcome.did_change);
        let stored = store.slot(&slot).unwrap();
        assert!(!stored.available);
        assert_eq!(stored.price, 500);

        // Offered again at the same price: availability restored, no new history
        assert!(!store.upsert_observation(&active).await.unwrap().did_change);
        assert!(store.slot(&slot).unwrap().available);
    }

    #[tokio::test]
    async fn test_inactive_unknown_slot_is_not_inserted() {
        let store = InMemoryFlightStore::new();
        let mut obs = observation(22, 500);
        obs.itinerary = None;
        store.upsert_observation(&obs).await.unwrap();
        assert_eq!(store.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_min_price_excludes_slot_and_unavailable() {
        let store = InMemoryFlightStore::new();
        let route = Route::parse("AEP", "COR").unwrap();
        let month = MonthKey::new(2025, 7).unwrap();

        let cheap = store.upsert_observation(&observation(10, 100)).await.unwrap().slot_id;
        store.upsert_observation(&observation(11, 120)).await.unwrap();

        assert_eq!(
            store.get_min_price(&route, month, "Economy", None).await.unwrap(),
            Some(100)
        );
        assert_eq!(
            store.get_min_price(&route, month, "Economy", Some(&cheap)).await.unwrap(),
            Some(120)
        );
        assert_eq!(
            store.get_min_price(&route, month, "Business", None).await.unwrap(),
            None
        );

        let mut gone = observation(10, 100);
        gone.itinerary = None;
        store.upsert_observation(&gone).await.unwrap();
        assert_eq!(
            store.get_min_price(&route, month, "Economy", None).await.unwrap(),
            Some(120)
        );
    }

    #[tokio::test]
    async fn test_recompute_skips_small_buckets() {
        let store = InMemoryFlightStore::new();
        for (day, price) in [(1, 400), (2, 500), (3, 600)] {
            store.upsert_observation(&observation(day, price)).await.unwrap();
        }
        assert_eq!(store.bulk_recompute_stats().await.unwrap(), 0);

        store.upsert_observation(&observation(4, 700)).await.unwrap();
        assert_eq!(store.bulk_recompute_stats().await.unwrap(), 1);

        let key = StatsKey::new(
            Route::parse("AEP", "COR").unwrap(),
            "Economy",
            MonthKey::new(2025, 7).unwrap(),
        );
        let stats = store.get_price_stats(&key).await.unwrap().unwrap();
        assert_eq!(stats.sample_size, 4);
        assert_eq!(stats.min, 400);
        assert_eq!(stats.max, 700);
    }

    #[tokio::test]
    async fn test_notification_ledger() {
        let store = InMemoryFlightStore::new();
        let slot = observation(22, 99).slot_id();

        assert!(!store.was_notified(&slot, 99, "aep").await.unwrap());
        store.mark_notified(&slot, 99, "aep").await.unwrap();
        store.mark_notified(&slot, 99, "aep").await.unwrap();

        assert!(store.was_notified(&slot, 99, "aep").await.unwrap());
        assert!(!store.was_notified(&slot, 98, "aep").await.unwrap());
        assert!(!store.was_notified(&slot, 99, "default").await.unwrap());
    }
}
