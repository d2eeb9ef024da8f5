//! Bearer credentials for the provider API

use crate::common::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque provider credential plus its lifecycle state
///
/// Debug output masks the credential so it never lands in logs verbatim.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    value: String,
    pub valid: bool,
    pub inserted_at: DateTime<Utc>,
}

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        Self::with_timestamp(value, Utc::now())
    }

    pub fn with_timestamp(
        value: impl Into<String>,
        inserted_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyToken);
        }
        Ok(Self {
            value,
            valid: true,
            inserted_at,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Short, log-safe rendering: first and last four characters
    pub fn masked(&self) -> String {
        mask(&self.value)
    }
}

/// Log-safe rendering of any credential string
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &self.masked())
            .field("valid", &self.valid)
            .field("inserted_at", &self.inserted_at)
            .finish()
    }
}
