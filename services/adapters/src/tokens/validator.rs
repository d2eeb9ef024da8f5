//! Token validator: periodically re-checks every active token
//!
//! Each token gets its own check task. A registry keyed by credential keeps a
//! token that is still mid-check from being checked twice.

use crate::client::FlightProvider;
use crate::error::{ScrapeError, WorkerError};
use crate::tokens::probe::ProbeGenerator;
use chrono::Local;
use config::{log_critical, log_error, log_success, log_tokens};
use dashmap::DashMap;
use state_flights::TokenStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use types::tokens::mask;

/// Classified result of one probe with a token
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Valid,
    Retry(ScrapeError),
    Expired,
}

/// Result of a full validation round for one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// No attempt succeeded; the token was invalidated
    Expired,
}

#[derive(Debug, Clone)]
pub struct ValidatorTiming {
    pub interval: Duration,
    pub max_retries: u32,
    pub error_delay: Duration,
}

/// Removes a token from the in-flight registry however its check ends
struct InFlight {
    registry: Arc<DashMap<String, Instant>>,
    token: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.registry.remove(&self.token);
    }
}

pub struct TokenValidator {
    provider: Arc<dyn FlightProvider>,
    store: Arc<dyn TokenStore>,
    probes: ProbeGenerator,
    timing: ValidatorTiming,
    in_flight: Arc<DashMap<String, Instant>>,
}

impl TokenValidator {
    pub fn new(
        provider: Arc<dyn FlightProvider>,
        store: Arc<dyn TokenStore>,
        probes: ProbeGenerator,
        timing: ValidatorTiming,
    ) -> Self {
        Self {
            provider,
            store,
            probes,
            timing,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Single authenticated search with `token`
    pub async fn probe(&self, token: &str) -> Result<ProbeOutcome, WorkerError> {
        let probe = self
            .probes
            .random_task(Local::now().date_naive())
            .ok_or_else(|| WorkerError::Configuration("token probes need two airports".into()))?;

        match self.provider.probe_token(token, &probe).await {
            Ok(()) => Ok(ProbeOutcome::Valid),
            Err(ScrapeError::ExpiredToken { .. }) => Ok(ProbeOutcome::Expired),
            Err(e) if e.is_transient() => Ok(ProbeOutcome::Retry(e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Up to `max_retries` probes; a valid probe short-circuits
    ///
    /// Running out of attempts without a valid probe expires the token,
    /// whether the attempts reported expiry or retryable errors.
    pub async fn check(&self, token: &str) -> Result<Verdict, WorkerError> {
        let max_retries = self.timing.max_retries.max(1);

        for attempt in 1..=max_retries {
            match self.probe(token).await? {
                ProbeOutcome::Valid => {
                    log_success!("Token valid: {}", mask(token));
                    return Ok(Verdict::Valid);
                }
                ProbeOutcome::Retry(e) => {
                    log_error!(
                        "Error checking token {} ({}/{}) | {}: {}",
                        mask(token),
                        attempt,
                        max_retries,
                        e.kind(),
                        e
                    );
                }
                ProbeOutcome::Expired => {
                    warn!("Token check failed ({}/{}): {}", attempt, max_retries, mask(token));
                }
            }
            if attempt < max_retries {
                tokio::time::sleep(self.timing.error_delay).await;
            }
        }
        Ok(Verdict::Expired)
    }

    /// Check `token` and invalidate it in the store once it has expired
    pub async fn validate(&self, token: &str) -> Result<Verdict, WorkerError> {
        let verdict = self.check(token).await?;
        if verdict == Verdict::Expired {
            self.store.invalidate(token).await?;
            warn!("Token marked as invalid: {}", mask(token));
        }
        Ok(verdict)
    }

    /// Claim `token` for checking; `None` when a check is already running
    fn claim(&self, token: &str) -> Option<InFlight> {
        let mut claimed = false;
        self.in_flight.entry(token.to_string()).or_insert_with(|| {
            claimed = true;
            Instant::now()
        });
        claimed.then(|| InFlight {
            registry: Arc::clone(&self.in_flight),
            token: token.to_string(),
        })
    }

    /// Every interval, spawn a check for each active token not already being checked
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<(), WorkerError> {
        log_tokens!("Token validator started");
        let mut checks: JoinSet<Result<Verdict, WorkerError>> = JoinSet::new();
        let mut waiting_logged = false;

        let outcome = loop {
            let active = match self.store.list_active().await {
                Ok(active) => active,
                Err(e) => break Err(e.into()),
            };

            if active.is_empty() {
                if !waiting_logged {
                    warn!("Waiting for new tokens to validate...");
                    waiting_logged = true;
                }
            } else {
                waiting_logged = false;
                for token in active {
                    let Some(guard) = self.claim(token.value()) else {
                        continue;
                    };
                    let validator = Arc::clone(&self);
                    checks.spawn(async move {
                        let verdict = validator.validate(&guard.token).await;
                        drop(guard);
                        verdict
                    });
                }
            }

            let deadline = tokio::time::Instant::now() + self.timing.interval;
            let fatal = loop {
                tokio::select! {
                    _ = cancel.cancelled() => break Some(Ok(())),
                    _ = tokio::time::sleep_until(deadline) => break None,
                    Some(joined) = checks.join_next(), if !checks.is_empty() => {
                        match joined {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => break Some(Err(e)),
                            Err(e) => break Some(Err(WorkerError::Aborted(e.to_string()))),
                        }
                    }
                }
            };
            if let Some(result) = fatal {
                break result;
            }
        };

        checks.abort_all();
        if let Err(e) = &outcome {
            log_critical!("Fatal error while checking tokens: {}", e);
        }
        outcome
    }
}
