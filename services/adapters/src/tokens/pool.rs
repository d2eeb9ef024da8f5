//! Shared pool of active bearer credentials
//!
//! Backed by a `watch` channel: waiters park until the set is non-empty,
//! and only a replace that actually changes the set wakes them.

use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::watch;
use types::BearerToken;

#[derive(Debug, Clone)]
pub struct TokenPool {
    active: Arc<watch::Sender<Vec<String>>>,
}

impl Default for TokenPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenPool {
    pub fn new() -> Self {
        let (active, _) = watch::channel(Vec::new());
        Self {
            active: Arc::new(active),
        }
    }

    /// Wait for at least one credential, then return one chosen uniformly at random
    ///
    /// There is no timeout: an empty pool is an expected state.
    pub async fn wait_any(&self) -> String {
        let mut rx = self.active.subscribe();
        loop {
            {
                let current = rx.borrow_and_update();
                if let Some(token) = current.choose(&mut rand::thread_rng()) {
                    return token.clone();
                }
            }
            // The pool owns the sender, so the channel outlives every waiter
            let _ = rx.changed().await;
        }
    }

    /// Atomically swap the active set; returns whether it changed
    ///
    /// Sets are compared by value, ignoring order and duplicates. Writers are
    /// serialized by the channel.
    pub fn replace_all<I, S>(&self, tokens: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next: Vec<String> = tokens.into_iter().map(Into::into).collect();
        next.sort_unstable();
        next.dedup();

        self.active.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    /// Replace the set with the values of stored tokens still flagged valid
    pub fn replace_with(&self, tokens: &[BearerToken]) -> bool {
        self.replace_all(
            tokens
                .iter()
                .filter(|token| token.valid)
                .map(|token| token.value().to_string()),
        )
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.active.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.active.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_waiter_blocks_until_tokens_arrive() {
        let pool = TokenPool::new();
        let waiter = tokio::spawn({
            let pool = pool.clone();
            async move { pool.wait_any().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        assert!(pool.replace_all(["token-a"]));
        let token = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_eq!(token, "token-a");
    }

    #[tokio::test]
    async fn test_empty_replace_keeps_waiters_blocked() {
        let pool = TokenPool::new();
        pool.replace_all(["token-a"]);
        assert!(pool.replace_all(Vec::<String>::new()));

        let blocked = timeout(Duration::from_millis(50), pool.wait_any()).await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn test_identical_set_does_not_notify() {
        let pool = TokenPool::new();
        assert!(pool.replace_all(["b", "a"]));

        let mut rx = pool.active.subscribe();
        rx.borrow_and_update();

        assert!(!pool.replace_all(["a", "b", "a"]));
        assert!(!rx.has_changed().unwrap());

        assert!(pool.replace_all(["a"]));
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_only_active_tokens_are_returned() {
        let pool = TokenPool::new();
        pool.replace_all(["x1", "x2", "x3"]);
        for _ in 0..50 {
            let token = pool.wait_any().await;
            assert!(["x1", "x2", "x3"].contains(&token.as_str()));
        }
    }

    #[test]
    fn test_replace_with_skips_invalidated() {
        let pool = TokenPool::new();
        let mut stale = BearerToken::new("stale-token-value").unwrap();
        stale.valid = false;
        let fresh = BearerToken::new("fresh-token-value").unwrap();

        pool.replace_with(&[stale, fresh]);
        assert_eq!(pool.snapshot(), vec!["fresh-token-value".to_string()]);
    }
}
