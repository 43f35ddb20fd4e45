//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output on stderr
//! - Configurable log levels (overridable through `RUST_LOG`)
//! - JSON file logging with rotation
//! - Helper macros for the analytics pipeline's recurring events
//!
//! # Example
//!
//! ```no_run
//! use pacemetrics::logging::init_logging;
//! use pacemetrics::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of an event store read
///
/// # Example
///
/// ```no_run
/// use pacemetrics::log_query_start;
/// use pacemetrics::domain::{DateRange, EventCategory};
///
/// let range = DateRange::parse("01/01/2023", "03/31/2023").unwrap();
/// log_query_start!(EventCategory::Falls, &range);
/// ```
#[macro_export]
macro_rules! log_query_start {
    ($category:expr, $range:expr) => {
        tracing::debug!(
            category = %$category,
            range = %$range,
            "Querying event store"
        );
    };
}

/// Log the completion of an event store read
///
/// # Example
///
/// ```no_run
/// use pacemetrics::log_query_complete;
/// use pacemetrics::domain::EventCategory;
/// use std::time::Duration;
///
/// log_query_complete!(EventCategory::Er, 42, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_query_complete {
    ($category:expr, $rows:expr, $duration:expr) => {
        tracing::debug!(
            category = %$category,
            rows = $rows,
            duration_ms = $duration.as_millis(),
            "Event store query completed"
        );
    };
}

/// Log a read that returned no rows
///
/// Empty results are an ordinary outcome; this is informational only.
///
/// # Example
///
/// ```no_run
/// use pacemetrics::log_empty_result;
/// use pacemetrics::domain::{DateRange, EventCategory};
///
/// let range = DateRange::parse("01/01/2023", "03/31/2023").unwrap();
/// log_empty_result!(EventCategory::Burns, &range);
/// ```
#[macro_export]
macro_rules! log_empty_result {
    ($category:expr, $range:expr) => {
        tracing::info!(
            category = %$category,
            range = %$range,
            "No events in range"
        );
    };
}

/// Log an outlier threshold that could not be computed
///
/// # Example
///
/// ```no_run
/// use pacemetrics::log_degenerate_threshold;
/// use pacemetrics::domain::EventCategory;
///
/// log_degenerate_threshold!(EventCategory::Falls, 1);
/// ```
#[macro_export]
macro_rules! log_degenerate_threshold {
    ($category:expr, $samples:expr) => {
        tracing::warn!(
            category = %$category,
            samples = $samples,
            "Outlier threshold undefined; excluding nobody"
        );
    };
}
