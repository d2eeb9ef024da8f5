//! Keeps the in-process token pool in sync with the token store

use crate::error::WorkerError;
use crate::tokens::pool::TokenPool;
use config::log_tokens;
use state_flights::TokenStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct LoaderTiming {
    /// Pause between reloads while the store has tokens
    pub refresh_interval: Duration,
    /// Pause while the store is empty
    pub empty_interval: Duration,
}

pub struct PoolLoader {
    store: Arc<dyn TokenStore>,
    pool: TokenPool,
    timing: LoaderTiming,
}

impl PoolLoader {
    pub fn new(store: Arc<dyn TokenStore>, pool: TokenPool, timing: LoaderTiming) -> Self {
        Self { store, pool, timing }
    }

    /// Load the active set once; returns whether the pool changed
    pub async fn load_once(&self) -> Result<bool, WorkerError> {
        let active = self.store.list_active().await?;
        let changed = self.pool.replace_with(&active);
        if changed {
            log_tokens!("Updated bearer tokens: {} active", self.pool.len());
        }
        Ok(changed)
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<(), WorkerError> {
        let mut waiting_logged = false;
        loop {
            let loaded = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                loaded = self.load_once() => loaded,
            };
            if let Err(e) = loaded {
                config::log_critical!("Token pool loader failed: {}", e);
                return Err(e);
            }

            // An empty store empties the pool, so workers wait instead of using revoked tokens
            let pause = if self.pool.is_empty() {
                if !waiting_logged {
                    warn!("Waiting for new tokens...");
                    waiting_logged = true;
                }
                self.timing.empty_interval
            } else {
                waiting_logged = false;
                self.timing.refresh_interval
            };

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}
