//! Provider payload parsing
//!
//! The calendar payload is walked field by field so that a schema change
//! surfaces as a [`ParseError`] naming the exact path that broke.

use crate::error::ParseError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use types::{CalendarBatch, FareOffer, FlightLeg, FlightObservation, IataCode, Itinerary, Route, ScrapeTask};

static ACCESS_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"window\.__ACCESS_TOKEN__\s*=\s*"([^"]+)""#).expect("static token pattern")
});

type Parsed<T> = std::result::Result<T, ParseError>;

/// Extract the bearer token embedded in the provider's search page
pub fn parse_access_token(html: &str) -> Option<String> {
    ACCESS_TOKEN
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn field<'a>(value: &'a Value, path: &str, key: &str) -> Parsed<&'a Value> {
    match value.get(key) {
        Some(Value::Null) | None => Err(ParseError::missing(format!("{}.{}", path, key))),
        Some(found) => Ok(found),
    }
}

fn str_field<'a>(value: &'a Value, path: &str, key: &str) -> Parsed<&'a str> {
    field(value, path, key)?
        .as_str()
        .ok_or_else(|| ParseError::invalid(format!("{}.{}", path, key), "string"))
}

fn u64_field(value: &Value, path: &str, key: &str) -> Parsed<u64> {
    field(value, path, key)?
        .as_u64()
        .ok_or_else(|| ParseError::invalid(format!("{}.{}", path, key), "unsigned integer"))
}

fn iata_field(value: &Value, path: &str, key: &str) -> Parsed<IataCode> {
    IataCode::new(str_field(value, path, key)?)
        .map_err(|_| ParseError::invalid(format!("{}.{}", path, key), "IATA code"))
}

fn time_field(value: &Value, path: &str, key: &str) -> Parsed<NaiveDateTime> {
    let raw = str_field(value, path, key)?;
    parse_timestamp(raw)
        .ok_or_else(|| ParseError::invalid(format!("{}.{}", path, key), "ISO-8601 timestamp"))
}

/// Accepts local timestamps, offset timestamps (kept in local time) and bare dates
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_leg(segment: &Value, path: &str) -> Parsed<FlightLeg> {
    let number = match field(segment, path, "flightNumber")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => {
            return Err(ParseError::invalid(
                format!("{}.flightNumber", path),
                "number or string",
            ))
        }
    };
    Ok(FlightLeg {
        flight_number: format!("{}{}", str_field(segment, path, "airline")?, number),
        origin: iata_field(segment, path, "origin")?,
        destination: iata_field(segment, path, "destination")?,
        departure: time_field(segment, path, "departure")?,
        arrival: time_field(segment, path, "arrival")?,
        equipment: segment
            .get("equipment")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn parse_offer(details: &Value, path: &str) -> Parsed<FareOffer> {
    let seats_path = format!("{}.seatAvailability", path);
    let seats = match field(details, path, "seatAvailability")?.get("seats") {
        None | Some(Value::Null) => None,
        Some(seats) => Some(
            seats
                .as_u64()
                .and_then(|s| u32::try_from(s).ok())
                .ok_or_else(|| ParseError::invalid(format!("{}.seats", seats_path), "seat count"))?,
        ),
    };

    let fare_path = format!("{}.fare", path);
    let total = field(field(details, path, "fare")?, &fare_path, "total")?
        .as_f64()
        .filter(|total| total.is_finite() && *total >= 0.0)
        .ok_or_else(|| ParseError::invalid(format!("{}.total", fare_path), "non-negative number"))?;

    Ok(FareOffer {
        class: str_field(details, path, "cabinClass")?.to_string(),
        seats_available: seats,
        // Fares are whole currency units, cents are dropped
        price: total.trunc() as u64,
    })
}

fn parse_calendar_entry(
    entry: &Value,
    path: &str,
    provider: &str,
    airline: &str,
    task: &ScrapeTask,
) -> Parsed<FlightObservation> {
    let leg = match entry.get("leg") {
        None | Some(Value::Null) => {
            let departure = time_field(entry, path, "departure")?;
            return Ok(FlightObservation::inactive(
                provider,
                airline,
                task.route.clone(),
                departure,
            ));
        }
        Some(leg) => leg,
    };

    let leg_path = format!("{}.leg", path);
    let segments = field(leg, &leg_path, "segments")?
        .as_array()
        .filter(|segments| !segments.is_empty())
        .ok_or_else(|| ParseError::invalid(format!("{}.segments", leg_path), "non-empty array"))?;
    let legs = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| parse_leg(segment, &format!("{}.segments[{}]", leg_path, i)))
        .collect::<Parsed<Vec<_>>>()?;

    let (first, last) = match (legs.first(), legs.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ParseError::invalid(format!("{}.segments", leg_path), "non-empty array")),
    };
    let route = Route::new(first.origin.clone(), last.destination.clone())
        .map_err(|_| ParseError::invalid(format!("{}.segments", leg_path), "distinct endpoints"))?;
    let departure = first.departure;
    let arrival = last.arrival;

    let duration_minutes = u32::try_from(u64_field(leg, &leg_path, "totalDuration")?)
        .map_err(|_| ParseError::invalid(format!("{}.totalDuration", leg_path), "minutes"))?;
    let stops = u64_field(leg, &leg_path, "stops")?;
    let offer = parse_offer(field(entry, path, "offerDetails")?, &format!("{}.offerDetails", path))?;

    Ok(FlightObservation {
        provider: provider.to_string(),
        airline: airline.to_string(),
        route,
        departure,
        itinerary: Some(Itinerary {
            arrival,
            duration_minutes,
            has_layover: stops >= 1,
            legs,
            offers: vec![offer],
        }),
    })
}

/// Parse a flex-dates calendar response for `task`
///
/// Slots without a viable leg become inactive observations on the task's route.
pub fn parse_calendar(
    body: &str,
    provider: &str,
    airline: &str,
    task: &ScrapeTask,
) -> Parsed<CalendarBatch> {
    let root: Value = serde_json::from_str(body).map_err(|e| ParseError::NotJson(e.to_string()))?;

    let offers = field(&root, "$", "calendarOffers")?;
    let entries = match offers.get("0") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(_) => return Err(ParseError::invalid("$.calendarOffers.0", "array")),
    };

    let observations = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            parse_calendar_entry(
                entry,
                &format!("$.calendarOffers.0[{}]", i),
                provider,
                airline,
                task,
            )
        })
        .collect::<Parsed<Vec<_>>>()?;

    let shopping_id = root
        .get("searchMetadata")
        .and_then(|meta| meta.get("shoppingId"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(CalendarBatch {
        provider: provider.to_string(),
        task: task.clone(),
        shopping_id,
        observations,
    })
}
