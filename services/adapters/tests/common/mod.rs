//! Scripted provider shared by the adapter integration tests

#![allow(dead_code)]

use adapter_service::{FlightProvider, Result, ScrapeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use types::{CalendarBatch, FlightObservation, ScrapeTask};

#[derive(Debug, Default)]
pub struct FakeProvider {
    calendar_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    calendar_failures: Mutex<HashMap<String, ScrapeError>>,
    tokens: Mutex<VecDeque<Result<String>>>,
    probes: Mutex<VecDeque<Result<()>>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every calendar request from `origin` fails with `error`
    pub fn fail_origin(&self, origin: &str, error: ScrapeError) {
        self.calendar_failures.lock().insert(origin.to_string(), error);
    }

    pub fn push_token(&self, result: Result<String>) {
        self.tokens.lock().push_back(result);
    }

    pub fn push_probe(&self, result: Result<()>) {
        self.probes.lock().push_back(result);
    }

    pub fn calendar_calls(&self) -> usize {
        self.calendar_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightProvider for FakeProvider {
    async fn fetch_calendar(&self, task: &ScrapeTask, _token: &str) -> Result<CalendarBatch> {
        self.calendar_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.calendar_failures.lock().get(task.route.origin().as_str()) {
            return Err(error.clone());
        }
        let departure = task.target_date.and_hms_opt(0, 0, 0).unwrap_or_default();
        Ok(CalendarBatch {
            provider: "fake".into(),
            task: task.clone(),
            shopping_id: None,
            observations: vec![FlightObservation::inactive(
                "fake",
                "XX",
                task.route.clone(),
                departure,
            )],
        })
    }

    async fn fetch_token(&self, _probe: &ScrapeTask) -> Result<String> {
        self.tokens.lock().pop_front().unwrap_or(Err(ScrapeError::TokenNotFound))
    }

    async fn probe_token(&self, _token: &str, _probe: &ScrapeTask) -> Result<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probes.lock().pop_front().unwrap_or(Ok(()))
    }
}
