/// Context information for send operations to aid in debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendContext {
    /// Size of the message payload in bytes
    pub message_size: usize,
    /// Partition key, if the message carried one
    pub key: Option<String>,
    /// Topic or channel the send was aimed at
    pub target: Option<String>,
}

impl SendContext {
    pub fn new(message_size: usize) -> Self {
        Self {
            message_size,
            key: None,
            target: None,
        }
    }

    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    #[error("Send failed: {error} (size: {size}B, key: {key:?}, target: {target:?})",
            size = context.message_size,
            key = context.key,
            target = context.target)]
    SendFailed { error: String, context: SendContext },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Handler failed on topic {topic}: {reason}")]
    HandlerFailed { topic: String, reason: String },

    #[error("HTTP {status} from {target}")]
    HttpStatus { status: u16, target: String },

    #[error("Sink closed")]
    Closed,

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl SinkError {
    /// Create a send failed error with context
    pub fn send_failed_with_context(msg: impl Into<String>, context: SendContext) -> Self {
        SinkError::SendFailed {
            error: msg.into(),
            context,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SinkError::InvalidConfig(msg.into())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return SinkError::Timeout(0);
        }
        let target = err
            .url()
            .map(|u| u.host_str().unwrap_or_default().to_string());
        let context = SendContext {
            message_size: 0,
            key: None,
            target,
        };
        SinkError::send_failed_with_context(err.to_string(), context)
    }
}
