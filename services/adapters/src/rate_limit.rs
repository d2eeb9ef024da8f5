//! Rate limiting for provider requests

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Optional per-minute request quota shared by every scrape worker
#[derive(Clone, Default)]
pub struct RequestQuota {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for RequestQuota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQuota")
            .field("limited", &self.is_limited())
            .finish()
    }
}

impl RequestQuota {
    /// `0` disables the quota
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_minute)
            .map(|rate| Arc::new(DefaultDirectRateLimiter::direct(Quota::per_minute(rate))));
        Self { limiter }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Check if a request is allowed right now (non-blocking)
    pub fn check(&self) -> bool {
        self.limiter
            .as_ref()
            .map(|limiter| limiter.check().is_ok())
            .unwrap_or(true)
    }

    /// Wait until a request is allowed
    pub async fn until_ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
