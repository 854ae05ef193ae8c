//! Error type definitions.
//!
//! This module defines all error, warning, and info types used throughout
//! the engine.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for invalid engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A numeric option fell outside its permitted range.
    #[error("{option} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        option: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// The link validation budget must cover at least twice the page budget.
    #[error("max_links_to_validate = {links} must be at least 2 x max_pages_to_crawl = {pages}")]
    LinkBudgetTooSmall { links: u32, pages: u32 },

    /// The seed URL could not be parsed or uses an unsupported scheme.
    #[error("invalid seed URL: {0}")]
    InvalidSeedUrl(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Error types for store reads and writes.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested run does not exist.
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// No stored body exists for the URL or any of its ancestors.
    #[error("source not found for {url} in run {run_id}")]
    SourceNotFound { run_id: String, url: String },

    /// The artifacts violate a persistence invariant; nothing was written.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Underlying database failure.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Persisted row could not be decoded.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Top-level engine errors. Only storage and invariant failures reach this
/// level; fetch- and validation-level failures are recovered locally and
/// materialized as typed fields on the persisted records.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Init(#[from] InitializationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal bookkeeping contradicted itself (for example, a URL state
    /// regressed). The run is aborted.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The run was cancelled before completion; partial results were
    /// discarded.
    #[error("run cancelled")]
    Cancelled,
}

/// Types of errors that can occur while crawling and validating.
///
/// This enum categorizes actual failure conditions observed at the network
/// layer; counts are reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    FetchTimeout,
    FetchTransport,
    FetchRateLimited,
    FetchGiveUp,
    HttpClientError,
    HttpServerError,
    ValidationTimeout,
    ValidationTransport,
    StoreWriteError,
}

/// Types of warnings: missing optional data worth tracking but not fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    MissingTitle,
    MalformedLink,
    OversizedBody,
}

/// Types of informational metrics: notable events that are neither errors
/// nor warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    HttpRedirect,
    RateLimitRecovered,
    PageBudgetReached,
    DepthLimitReached,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::FetchTimeout => "Fetch timeout",
            ErrorType::FetchTransport => "Fetch transport error",
            ErrorType::FetchRateLimited => "Fetch rate limited (429)",
            ErrorType::FetchGiveUp => "Fetch retries exhausted",
            ErrorType::HttpClientError => "HTTP 4xx response",
            ErrorType::HttpServerError => "HTTP 5xx response",
            ErrorType::ValidationTimeout => "Validation timeout",
            ErrorType::ValidationTransport => "Validation transport error",
            ErrorType::StoreWriteError => "Store write error",
        }
    }
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::MissingTitle => "Missing title",
            WarningType::MalformedLink => "Malformed link dropped",
            WarningType::OversizedBody => "Body truncated at size cap",
        }
    }
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::HttpRedirect => "HTTP redirect",
            InfoType::RateLimitRecovered => "Recovered after 429 backoff",
            InfoType::PageBudgetReached => "Page budget reached",
            InfoType::DepthLimitReached => "Depth limit reached",
        }
    }
}
