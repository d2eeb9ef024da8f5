//! In-memory token store

use crate::traits::{Result, TokenStore};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use types::BearerToken;

#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<String, BearerToken>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn list_active(&self) -> Result<Vec<BearerToken>> {
        let mut active: Vec<BearerToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.valid)
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by_key(|token| token.inserted_at);
        Ok(active)
    }

    async fn insert(&self, token: BearerToken) -> Result<()> {
        // First writer wins; a re-inserted credential keeps its original state
        self.tokens
            .entry(token.value().to_string())
            .or_insert(token);
        Ok(())
    }

    async fn invalidate(&self, value: &str) -> Result<()> {
        match self.tokens.get_mut(value) {
            Some(mut token) => token.valid = false,
            None => debug!("Invalidate for unknown token {}", types::tokens::mask(value)),
        }
        Ok(())
    }

    async fn exists(&self, value: &str) -> Result<bool> {
        Ok(self.tokens.contains_key(value))
    }
}
