//! Route and calendar-date generation for a scrape cycle

use chrono::{Datelike, NaiveDate};
use config::AirportSettings;
use std::collections::BTreeMap;
use types::{IataCode, Route, ValidationError};

/// Day of month every calendar query is anchored on
pub const CALENDAR_ANCHOR_DAY: u32 = 16;

/// Every ordered airport pair that crosses metro groups
///
/// Groups whose name contains `_` are disabled. An airport listed in several
/// groups belongs to the last one. Output is sorted by (origin, destination).
pub fn create_routes(airports: &AirportSettings) -> Result<Vec<Route>, ValidationError> {
    let mut metro_of: BTreeMap<IataCode, &str> = BTreeMap::new();
    for (group, codes) in airports.enabled_groups() {
        for code in codes {
            metro_of.insert(IataCode::new(code)?, group.as_str());
        }
    }

    let mut routes = Vec::new();
    for (origin, origin_metro) in &metro_of {
        for (destination, destination_metro) in &metro_of {
            if origin == destination || origin_metro == destination_metro {
                continue;
            }
            routes.push(Route::new(origin.clone(), destination.clone())?);
        }
    }
    Ok(routes)
}

/// Target dates for one cycle
///
/// Before the anchor day this month's anchor is included; on or after it,
/// tomorrow is used instead while it is still in this month. Then the anchor
/// day of each of the next `months_ahead` months.
pub fn calendar_dates(today: NaiveDate, months_ahead: u32) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(months_ahead as usize + 1);

    let current = if today.day() < CALENDAR_ANCHOR_DAY {
        today.with_day(CALENDAR_ANCHOR_DAY)
    } else {
        today.succ_opt().filter(|tomorrow| tomorrow.month() == today.month())
    };
    dates.extend(current);

    for offset in 1..=months_ahead {
        let month0 = today.month0() + offset;
        let year = today.year() + (month0 / 12) as i32;
        dates.extend(NaiveDate::from_ymd_opt(year, month0 % 12 + 1, CALENDAR_ANCHOR_DAY));
    }
    dates
}
