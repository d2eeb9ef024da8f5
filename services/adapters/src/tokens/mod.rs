//! Token lifecycle: the shared pool and the loops that fill and prune it

pub mod finder;
pub mod loader;
pub mod pool;
pub mod probe;
pub mod validator;

pub use finder::{FinderOutcome, FinderTiming, TokenFinder};
pub use loader::{LoaderTiming, PoolLoader};
pub use pool::TokenPool;
pub use probe::ProbeGenerator;
pub use validator::{ProbeOutcome, TokenValidator, ValidatorTiming, Verdict};
