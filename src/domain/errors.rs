//! Domain error types
//!
//! This module defines the error hierarchy for pacemetrics.
//! All errors are domain-specific and don't expose third-party types.
//!
//! Only caller mistakes and store failures are errors. Empty result sets,
//! zero denominators and degenerate outlier statistics are ordinary outcomes
//! and are carried in the result types instead.

use thiserror::Error;

/// Main pacemetrics error type
///
/// This is the primary error type used throughout the engine.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Secondary filter value is not present in the filter lookup table
    #[error("Invalid filter: '{0}' is not a recognised secondary filter value")]
    InvalidFilter(String),

    /// Caller supplied a date that could not be parsed
    #[error("Invalid date '{input}': {reason}")]
    DateParse { input: String, reason: String },

    /// Validation errors (bad identifiers, unsupported metric/category pairs)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Event store errors
    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl AnalyticsError {
    /// Whether the error was caused by caller input rather than the environment
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AnalyticsError::InvalidFilter(_)
                | AnalyticsError::DateParse { .. }
                | AnalyticsError::Validation(_)
        )
    }
}

/// Event store errors
///
/// Errors that occur while reading enrollment or event rows.
/// These errors don't expose the database driver types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open a connection to the store
    #[error("Failed to connect to event store: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A returned row could not be decoded
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// The store cannot express the requested query shape
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for AnalyticsError {
    fn from(err: std::io::Error) -> Self {
        AnalyticsError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for AnalyticsError {
    fn from(err: toml::de::Error) -> Self {
        AnalyticsError::Configuration(format!("TOML parse error: {err}"))
    }
}
