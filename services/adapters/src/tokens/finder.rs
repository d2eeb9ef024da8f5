//! Token finder: keeps probing the provider's search page for new credentials

use crate::client::FlightProvider;
use crate::error::{ScrapeError, WorkerError};
use crate::tokens::probe::ProbeGenerator;
use chrono::Local;
use config::{log_critical, log_error, log_search, log_success};
use state_flights::TokenStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use types::tokens::mask;
use types::BearerToken;

/// Result of one discovery attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FinderOutcome {
    /// A credential the store had never seen; holds its masked form
    Stored(String),
    Duplicate,
    Retry(ScrapeError),
}

#[derive(Debug, Clone)]
pub struct FinderTiming {
    pub duplicate_backoff: Duration,
    pub error_delay: Duration,
}

pub struct TokenFinder {
    provider: Arc<dyn FlightProvider>,
    store: Arc<dyn TokenStore>,
    probes: ProbeGenerator,
    timing: FinderTiming,
}

impl TokenFinder {
    pub fn new(
        provider: Arc<dyn FlightProvider>,
        store: Arc<dyn TokenStore>,
        probes: ProbeGenerator,
        timing: FinderTiming,
    ) -> Self {
        Self {
            provider,
            store,
            probes,
            timing,
        }
    }

    /// One probe; fatal provider or store failures are returned as errors
    pub async fn find_once(&self) -> Result<FinderOutcome, WorkerError> {
        let probe = self
            .probes
            .random_task(Local::now().date_naive())
            .ok_or_else(|| WorkerError::Configuration("token probes need two airports".into()))?;

        let value = match self.provider.fetch_token(&probe).await {
            Ok(value) => value,
            Err(e) if e.is_transient() => return Ok(FinderOutcome::Retry(e)),
            Err(e) => return Err(e.into()),
        };

        if self.store.exists(&value).await? {
            return Ok(FinderOutcome::Duplicate);
        }
        let masked = mask(&value);
        self.store.insert(BearerToken::new(value)?).await?;
        Ok(FinderOutcome::Stored(masked))
    }

    /// Probe until cancelled or a fatal failure
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), WorkerError> {
        log_search!("Token finder started");
        let mut waiting_logged = false;

        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                outcome = self.find_once() => outcome,
            };

            let pause = match outcome {
                Ok(FinderOutcome::Stored(masked)) => {
                    log_success!("New bearer token stored: {}", masked);
                    waiting_logged = false;
                    None
                }
                Ok(FinderOutcome::Duplicate) => {
                    if !waiting_logged {
                        warn!("Waiting for new tokens...");
                        waiting_logged = true;
                    }
                    Some(self.timing.duplicate_backoff)
                }
                Ok(FinderOutcome::Retry(e)) => {
                    log_error!("Error searching bearer token | {}: {}", e.kind(), e);
                    Some(self.timing.error_delay)
                }
                Err(e) => {
                    log_critical!("Unhandled error while searching token: {}", e);
                    return Err(e);
                }
            };

            if let Some(pause) = pause {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }
    }
}
