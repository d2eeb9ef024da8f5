//! Error types for the provider adapter

use message_sink::SinkError;
use state_flights::StoreError;
use thiserror::Error;
use types::ValidationError;

/// Result type alias for provider calls
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Malformed provider payload; `path` names the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Missing field '{path}'")]
    MissingField { path: String },

    #[error("Invalid field '{path}': expected {expected}")]
    InvalidField { path: String, expected: String },

    #[error("Response is not JSON: {0}")]
    NotJson(String),
}

impl ParseError {
    pub fn missing(path: impl Into<String>) -> Self {
        ParseError::MissingField { path: path.into() }
    }

    pub fn invalid(path: impl Into<String>, expected: impl Into<String>) -> Self {
        ParseError::InvalidField {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

/// Outcome of one provider request that was not a usable success
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScrapeError {
    #[error("Invalid request, service may not be available for this search ({context})")]
    InvalidRequest { context: String },

    #[error("Departure date is in the past ({context})")]
    InvalidPastDate { context: String },

    #[error("Departure date has an invalid format ({context})")]
    InvalidDateFormat { context: String },

    #[error("Bearer token was never valid")]
    UnauthorizedToken,

    #[error("Bearer token expired ({context})")]
    ExpiredToken { context: String },

    #[error("Requests blocked with HTTP {status} ({context})")]
    RequestsBlocked { status: u16, context: String },

    #[error("GDS returned a server error ({context})")]
    UpstreamError { context: String },

    #[error("Provider site appears to be down ({context})")]
    ServiceDown { context: String },

    #[error("Unknown response HTTP {status}: {body} ({context})")]
    Unknown {
        status: u16,
        body: String,
        context: String,
    },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Bearer token not found in page, structure may have changed")]
    TokenNotFound,

    #[error("Failed to parse provider response: {0}")]
    Parse(#[from] ParseError),
}

impl ScrapeError {
    /// Machine-readable kind, stable across releases
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InvalidRequest { .. } => "invalid_request",
            ScrapeError::InvalidPastDate { .. } => "invalid_past_date",
            ScrapeError::InvalidDateFormat { .. } => "invalid_date_format",
            ScrapeError::UnauthorizedToken => "unauthorized_token",
            ScrapeError::ExpiredToken { .. } => "expired_token",
            ScrapeError::RequestsBlocked { .. } => "requests_blocked",
            ScrapeError::UpstreamError { .. } => "upstream_error",
            ScrapeError::ServiceDown { .. } => "service_down",
            ScrapeError::Unknown { .. } => "unknown",
            ScrapeError::Transport(_) => "transport",
            ScrapeError::TokenNotFound => "token_not_found",
            ScrapeError::Parse(_) => "parse",
        }
    }

    /// Skip the current scrape task and keep the worker running
    pub fn is_task_recoverable(&self) -> bool {
        matches!(
            self,
            ScrapeError::RequestsBlocked { .. }
                | ScrapeError::InvalidPastDate { .. }
                | ScrapeError::ExpiredToken { .. }
                | ScrapeError::UpstreamError { .. }
                | ScrapeError::ServiceDown { .. }
                | ScrapeError::InvalidRequest { .. }
                | ScrapeError::Transport(_)
        )
    }

    /// Retry a token probe after the error delay
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScrapeError::RequestsBlocked { .. }
                | ScrapeError::InvalidPastDate { .. }
                | ScrapeError::UpstreamError { .. }
                | ScrapeError::ServiceDown { .. }
                | ScrapeError::Transport(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_task_recoverable()
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Transport(err.to_string())
    }
}

/// Failure that terminates a long-running loop
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Publish failure: {0}")]
    Publish(#[from] SinkError),

    #[error("Invalid value: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Worker task aborted: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_recoverable_set() {
        let recoverable = [
            ScrapeError::RequestsBlocked { status: 429, context: String::new() },
            ScrapeError::InvalidPastDate { context: String::new() },
            ScrapeError::ExpiredToken { context: String::new() },
            ScrapeError::UpstreamError { context: String::new() },
            ScrapeError::ServiceDown { context: String::new() },
            ScrapeError::InvalidRequest { context: String::new() },
        ];
        assert!(recoverable.iter().all(ScrapeError::is_task_recoverable));

        let fatal = [
            ScrapeError::UnauthorizedToken,
            ScrapeError::InvalidDateFormat { context: String::new() },
            ScrapeError::Unknown { status: 418, body: String::new(), context: String::new() },
            ScrapeError::TokenNotFound,
            ScrapeError::Parse(ParseError::missing("calendarOffers")),
        ];
        assert!(fatal.iter().all(ScrapeError::is_fatal));
    }

    #[test]
    fn test_expired_token_is_not_transient_for_probes() {
        let expired = ScrapeError::ExpiredToken { context: String::new() };
        assert!(expired.is_task_recoverable());
        assert!(!expired.is_transient());
        assert_eq!(expired.kind(), "expired_token");
    }
}
