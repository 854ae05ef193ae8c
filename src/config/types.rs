//! Configuration types.
//!
//! This module defines the library configuration struct and the enums used
//! for command-line argument parsing.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::config::constants::{
    CRAWL_DEPTH_RANGE, DEFAULT_USER_AGENT, LINK_BUDGET_RANGE, PAGE_BUDGET_RANGE,
};
use crate::error_handling::ConfigError;

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which link categories the extractor emits.
///
/// Same-origin anchor links are always useful and on by default; the other
/// three categories are opt-in because they inflate the edge set quickly.
#[derive(Debug, Clone, Copy)]
pub struct LinkToggles {
    /// `<a href>`, `<link href>`, `<area href>`
    pub static_html: bool,
    /// onclick handlers, data-url/data-href attributes, inline script URLs
    pub dynamic_js: bool,
    /// images, scripts, stylesheets, media sources (by file extension)
    pub resource: bool,
    /// absolute URLs whose registrable host differs from the seed's
    pub external: bool,
}

impl Default for LinkToggles {
    fn default() -> Self {
        Self {
            static_html: true,
            dynamic_js: false,
            resource: false,
            external: false,
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// This is the core configuration struct used by the library. It can be
/// constructed programmatically without any CLI dependencies.
///
/// # Examples
///
/// ```no_run
/// use site_insights::EngineConfig;
/// use std::path::PathBuf;
///
/// let config = EngineConfig {
///     max_crawl_depth: 3,
///     max_pages_to_crawl: 200,
///     max_links_to_validate: 400,
///     db_path: PathBuf::from("./insights.db"),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// BFS depth bound from the seed (1..=5)
    pub max_crawl_depth: u32,

    /// Upper bound on distinct URLs fetched (10..=1000)
    pub max_pages_to_crawl: u32,

    /// Upper bound on edges validated (10..=2000, at least 2x the page budget)
    pub max_links_to_validate: u32,

    /// Link extraction toggles
    pub link_toggles: LinkToggles,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Maximum concurrent crawl requests (fetcher semaphore size)
    pub max_concurrent_requests: usize,

    /// Retries on transport errors and 5xx responses
    pub retry_attempts: u32,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Wall-clock ceiling for a run in seconds (None = unbounded)
    pub max_run_seconds: Option<u64>,

    /// Local HTTP progress endpoint port (disabled by default)
    pub status_port: Option<u16>,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_crawl_depth: 2,
            max_pages_to_crawl: 100,
            max_links_to_validate: 200,
            link_toggles: LinkToggles::default(),
            request_timeout_seconds: 30,
            max_concurrent_requests: 20,
            retry_attempts: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            db_path: PathBuf::from("./site_insights.db"),
            max_run_seconds: None,
            status_port: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

impl EngineConfig {
    /// Validates the configured budgets against their permitted ranges.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the offending option when a value is
    /// out of range, or when `max_links_to_validate` is smaller than twice
    /// `max_pages_to_crawl`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_crawl_depth", self.max_crawl_depth, CRAWL_DEPTH_RANGE)?;
        check_range(
            "max_pages_to_crawl",
            self.max_pages_to_crawl,
            PAGE_BUDGET_RANGE,
        )?;
        check_range(
            "max_links_to_validate",
            self.max_links_to_validate,
            LINK_BUDGET_RANGE,
        )?;

        if self.max_links_to_validate < self.max_pages_to_crawl.saturating_mul(2) {
            return Err(ConfigError::LinkBudgetTooSmall {
                links: self.max_links_to_validate,
                pages: self.max_pages_to_crawl,
            });
        }

        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::OutOfRange {
                option: "max_concurrent_requests",
                value: 0,
                min: 1,
                max: u32::MAX,
            });
        }

        Ok(())
    }
}

fn check_range(option: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            option,
            value,
            min,
            max,
        });
    }
    Ok(())
}
