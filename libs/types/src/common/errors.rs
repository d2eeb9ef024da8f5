//! Validation errors for identifiers and domain records

use thiserror::Error;

/// Errors raised while constructing validated domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Not a three-letter alphabetic IATA code
    #[error("Invalid IATA code '{code}': expected three ASCII letters")]
    InvalidIata { code: String },

    /// Route whose origin and destination are the same airport
    #[error("Route origin and destination are both {code}")]
    SameAirport { code: String },

    /// Calendar month outside 1..=12 or an unrepresentable date
    #[error("Invalid calendar month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    /// Empty credential string
    #[error("Bearer token cannot be empty")]
    EmptyToken,
}
