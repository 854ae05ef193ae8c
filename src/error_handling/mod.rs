//! Error taxonomy and processing statistics.
//!
//! Fetch- and validation-level failures are recovered locally and recorded
//! as typed fields or counters; only configuration, storage, and invariant
//! failures surface as errors from the engine.

mod stats;
mod types;

pub use stats::ProcessingStats;
pub use types::{
    ConfigError, DatabaseError, EngineError, ErrorType, InfoType, InitializationError, StoreError,
    WarningType,
};
