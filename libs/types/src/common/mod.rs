pub mod errors;
pub mod identifiers;

pub use errors::ValidationError;
pub use identifiers::{IataCode, MonthKey, Route, SlotId};
