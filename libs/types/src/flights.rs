//! Calendar observations produced by the scraper and consumed by the flight store

use crate::common::{IataCode, MonthKey, Route, SlotId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One unit of scrape work: a route and the calendar date to query around
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub route: Route,
    pub target_date: NaiveDate,
}

impl ScrapeTask {
    pub fn new(route: Route, target_date: NaiveDate) -> Self {
        Self { route, target_date }
    }
}

impl std::fmt::Display for ScrapeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.route, self.target_date)
    }
}

/// A single flown segment of an itinerary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLeg {
    /// Airline code followed by the number, e.g. `AR1550`
    pub flight_number: String,
    pub origin: IataCode,
    pub destination: IataCode,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub equipment: Option<String>,
}

/// A purchasable fare for the slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareOffer {
    /// Cabin class as reported by the provider (`Economy`, `Business`, ...)
    pub class: String,
    pub seats_available: Option<u32>,
    /// Total fare in whole currency units
    pub price: u64,
}

/// Bookable part of an observation; absent for slots with no viable offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub arrival: NaiveDateTime,
    pub duration_minutes: u32,
    pub has_layover: bool,
    pub legs: Vec<FlightLeg>,
    pub offers: Vec<FareOffer>,
}

/// Parsed result for one calendar slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightObservation {
    pub provider: String,
    pub airline: String,
    pub route: Route,
    pub departure: NaiveDateTime,
    pub itinerary: Option<Itinerary>,
}

impl FlightObservation {
    /// Slot the provider lists without any viable offer
    pub fn inactive(
        provider: impl Into<String>,
        airline: impl Into<String>,
        route: Route,
        departure: NaiveDateTime,
    ) -> Self {
        Self {
            provider: provider.into(),
            airline: airline.into(),
            route,
            departure,
            itinerary: None,
        }
    }

    pub fn slot_id(&self) -> SlotId {
        SlotId::compute(&self.provider, &self.airline, &self.route, self.departure_date())
    }

    pub fn departure_date(&self) -> NaiveDate {
        self.departure.date()
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.departure_date())
    }

    pub fn is_available(&self) -> bool {
        self.itinerary.is_some()
    }

    pub fn offers(&self) -> &[FareOffer] {
        self.itinerary
            .as_ref()
            .map(|it| it.offers.as_slice())
            .unwrap_or(&[])
    }

    /// The offer the deal engine scores: the first one listed
    pub fn primary_offer(&self) -> Option<&FareOffer> {
        self.offers().first()
    }
}

/// Everything one successful calendar query produced, as published on the calendar topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarBatch {
    pub provider: String,
    pub task: ScrapeTask,
    pub shopping_id: Option<String>,
    pub observations: Vec<FlightObservation>,
}

impl CalendarBatch {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.observations.iter().filter(|o| o.is_available()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_inactive_slot_has_no_offers() {
        let obs = FlightObservation::inactive(
            "AerolineasARG",
            "AR",
            Route::parse("BUE", "COR").unwrap(),
            at("2025-07-22T00:00:00"),
        );
        assert!(!obs.is_available());
        assert!(obs.primary_offer().is_none());
        assert_eq!(obs.month().to_string(), "2025-07");
    }

    #[test]
    fn test_slot_id_ignores_time_of_day_and_price() {
        let route = Route::parse("BUE", "COR").unwrap();
        let morning = FlightObservation::inactive("P", "AR", route.clone(), at("2025-07-22T06:00:00"));
        let mut evening = FlightObservation::inactive("P", "AR", route, at("2025-07-22T21:45:00"));
        evening.itinerary = Some(Itinerary {
            arrival: at("2025-07-22T23:10:00"),
            duration_minutes: 85,
            has_layover: false,
            legs: vec![],
            offers: vec![FareOffer {
                class: "Economy".into(),
                seats_available: Some(4),
                price: 150,
            }],
        });
        assert_eq!(morning.slot_id(), evening.slot_id());
    }

    #[test]
    fn test_timestamps_serialize_iso8601() {
        let obs = FlightObservation::inactive(
            "P",
            "AR",
            Route::parse("BUE", "COR").unwrap(),
            at("2025-07-22T21:45:00"),
        );
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["departure"], "2025-07-22T21:45:00");
    }
}
