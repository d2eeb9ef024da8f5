use crate::SinkError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Maximum message size in bytes (1MB default)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Transport-agnostic message envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    /// Partition key; messages sharing a key are related (same origin airport)
    pub key: Option<String>,
    /// Encoded record, JSON for every topic in the pipeline
    pub payload: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message, validating size
    pub fn new(
        topic: impl Into<String>,
        key: Option<String>,
        payload: Vec<u8>,
    ) -> Result<Self, SinkError> {
        if payload.len() > DEFAULT_MAX_MESSAGE_SIZE {
            return Err(SinkError::Other(format!(
                "Message too large: {}B exceeds limit of {}B",
                payload.len(),
                DEFAULT_MAX_MESSAGE_SIZE
            )));
        }
        Ok(Self {
            topic: topic.into(),
            key,
            payload,
            published_at: Utc::now(),
        })
    }

    /// Serialize `record` as JSON; timestamps come out as ISO-8601 strings
    pub fn json<T: Serialize>(
        topic: impl Into<String>,
        key: Option<String>,
        record: &T,
    ) -> Result<Self, SinkError> {
        Self::new(topic, key, serde_json::to_vec(record)?)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SinkError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Get message size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
