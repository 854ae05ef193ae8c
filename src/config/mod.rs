//! Engine configuration.
//!
//! This module defines the library configuration struct, the CLI-facing
//! enums, and the operational constants used throughout the engine.

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{EngineConfig, LinkToggles, LogFormat, LogLevel};
