//! Random searches used to discover and check tokens

use chrono::{Duration, NaiveDate};
use config::AirportSettings;
use rand::seq::SliceRandom;
use rand::Rng;
use types::{IataCode, Route, ScrapeTask, ValidationError};

#[derive(Debug, Clone)]
pub struct ProbeGenerator {
    airports: Vec<IataCode>,
    window_days: u32,
}

impl ProbeGenerator {
    pub fn new(airports: Vec<IataCode>, window_days: u32) -> Self {
        Self {
            airports,
            window_days,
        }
    }

    /// Every airport of every enabled metro group
    pub fn from_settings(airports: &AirportSettings, window_days: u32) -> Result<Self, ValidationError> {
        let mut codes = airports
            .enabled_groups()
            .flat_map(|(_, codes)| codes.iter())
            .map(|code| IataCode::new(code))
            .collect::<Result<Vec<_>, _>>()?;
        codes.sort();
        codes.dedup();
        Ok(Self::new(codes, window_days))
    }

    /// A one-way search between two random airports, up to `window_days` ahead
    ///
    /// `None` when fewer than two airports are configured.
    pub fn random_task(&self, today: NaiveDate) -> Option<ScrapeTask> {
        let mut rng = rand::thread_rng();
        let origin = self.airports.choose(&mut rng)?;
        let others: Vec<&IataCode> = self.airports.iter().filter(|code| *code != origin).collect();
        let destination = others.choose(&mut rng)?;
        let route = Route::new(origin.clone(), (*destination).clone()).ok()?;

        let offset = rng.gen_range(0..=self.window_days);
        Some(ScrapeTask::new(route, today + Duration::days(i64::from(offset))))
    }
}
