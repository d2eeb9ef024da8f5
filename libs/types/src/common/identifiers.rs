//! # Typed Identifiers - Airports, Routes, Calendar Slots
//!
//! Validated newtypes shared by the scraper, the flight store and the deal engine.
//!
//! - [`IataCode`]: three-letter airport code, normalised to upper-case
//! - [`Route`]: ordered origin/destination pair, never the same airport twice
//! - [`SlotId`]: content hash identifying a calendar slot across scrapes
//! - [`MonthKey`]: year-month bucket used for statistics and monthly minimums
//!
//! ```rust
//! use types::{IataCode, Route, SlotId};
//! use chrono::NaiveDate;
//!
//! let route = Route::new(IataCode::new("bue")?, IataCode::new("COR")?)?;
//! let date = NaiveDate::from_ymd_opt(2025, 7, 22).unwrap();
//! let slot = SlotId::compute("AerolineasARG", "AR", &route, date);
//! assert_eq!(slot.as_str().len(), 64);
//! # Ok::<(), types::ValidationError>(())
//! ```

use super::errors::ValidationError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Three-letter IATA airport or metro code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IataCode(String);

impl IataCode {
    pub fn new(code: &str) -> Result<Self, ValidationError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidIata {
                code: code.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IataCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<IataCode> for String {
    fn from(code: IataCode) -> Self {
        code.0
    }
}

impl FromStr for IataCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for IataCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered (origin, destination) pair
///
/// Construction rejects same-airport pairs. Same-metro filtering happens in
/// route generation, where the metro grouping is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RouteParts", into = "RouteParts")]
pub struct Route {
    origin: IataCode,
    destination: IataCode,
}

#[derive(Serialize, Deserialize)]
struct RouteParts {
    origin: IataCode,
    destination: IataCode,
}

impl Route {
    pub fn new(origin: IataCode, destination: IataCode) -> Result<Self, ValidationError> {
        if origin == destination {
            return Err(ValidationError::SameAirport {
                code: origin.0,
            });
        }
        Ok(Self {
            origin,
            destination,
        })
    }

    /// Parse both codes and build the route in one step
    pub fn parse(origin: &str, destination: &str) -> Result<Self, ValidationError> {
        Self::new(IataCode::new(origin)?, IataCode::new(destination)?)
    }

    pub fn origin(&self) -> &IataCode {
        &self.origin
    }

    pub fn destination(&self) -> &IataCode {
        &self.destination
    }
}

impl TryFrom<RouteParts> for Route {
    type Error = ValidationError;

    fn try_from(parts: RouteParts) -> Result<Self, Self::Error> {
        Self::new(parts.origin, parts.destination)
    }
}

impl From<Route> for RouteParts {
    fn from(route: Route) -> Self {
        Self {
            origin: route.origin,
            destination: route.destination,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.origin, self.destination)
    }
}

/// Identity of a calendar slot: hex SHA-256 of provider, airline, route and departure day
///
/// Price is deliberately not part of the identity; a slot keeps its id while
/// its fare moves between scrapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn compute(provider: &str, airline: &str, route: &Route, departure: NaiveDate) -> Self {
        let raw = Self::raw_key(provider, airline, route, departure);
        Self(hex::encode(Sha256::digest(raw.as_bytes())))
    }

    /// Pre-image of the hash, useful when logging a slot
    pub fn raw_key(provider: &str, airline: &str, route: &Route, departure: NaiveDate) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            provider,
            airline,
            route.origin(),
            route.destination(),
            departure.format("%Y-%m-%d")
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Year-month bucket (`YYYY-MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ValidationError::InvalidMonth { year, month });
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iata_normalisation() {
        assert_eq!(IataCode::new(" bue ").unwrap().as_str(), "BUE");
        assert!(IataCode::new("BU").is_err());
        assert!(IataCode::new("B1E").is_err());
    }

    #[test]
    fn test_route_rejects_same_airport() {
        let err = Route::parse("AEP", "aep").unwrap_err();
        assert_eq!(err, ValidationError::SameAirport { code: "AEP".into() });
    }

    #[test]
    fn test_route_deserialize_validates() {
        let ok: Route = serde_json::from_str(r#"{"origin":"BUE","destination":"COR"}"#).unwrap();
        assert_eq!(ok.to_string(), "BUE->COR");

        let bad = serde_json::from_str::<Route>(r#"{"origin":"BUE","destination":"BUE"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_slot_id_is_reproducible() {
        let route = Route::parse("BUE", "COR").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 7, 22).unwrap();

        let a = SlotId::compute("AerolineasARG", "AR", &route, date);
        let b = SlotId::compute("AerolineasARG", "AR", &route, date);
        assert_eq!(a, b);
        assert_eq!(
            SlotId::raw_key("AerolineasARG", "AR", &route, date),
            "AerolineasARG_AR_BUE_COR_2025-07-22"
        );

        let other_day = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
        assert_ne!(a, SlotId::compute("AerolineasARG", "AR", &route, other_day));
    }

    #[test]
    fn test_month_key() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 22).unwrap();
        let key = MonthKey::of(date);
        assert_eq!(key.to_string(), "2025-07");
        assert!(key.contains(date));
        assert!(!key.contains(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()));
        assert!(MonthKey::new(2025, 13).is_err());
    }
}
