//! Shared arguments and output helpers for the analytics commands

use crate::adapters::store::create_event_store;
use crate::config::{load_config, PaceMetricsConfig};
use crate::core::aggregate::Matrix;
use crate::core::census::DenominatorSeries;
use crate::core::filter::FilterSpec;
use crate::core::service::AnalyticsService;
use crate::domain::{AnalyticsError, DateRange, OrgFilter, StoreError};
use clap::Args;
use serde::Serialize;
use std::fmt::Display;

/// Exit code for success
pub const EXIT_OK: i32 = 0;
/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for invalid dates, filters and other caller input
pub const EXIT_INVALID_INPUT: i32 = 3;
/// Exit code for event store connection failures
pub const EXIT_STORE_CONNECTION: i32 = 4;
/// Exit code for everything else
pub const EXIT_FATAL: i32 = 5;

/// Date range, organizational unit and output format
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// First day of the range (MM/DD/YYYY)
    #[arg(long)]
    pub start: String,

    /// Last day of the range (MM/DD/YYYY)
    #[arg(long)]
    pub end: String,

    /// Organizational unit, or "all"
    #[arg(long, default_value = "all")]
    pub org: String,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl RangeArgs {
    pub fn date_range(&self) -> crate::domain::Result<DateRange> {
        DateRange::parse(&self.start, &self.end)
    }

    pub fn org_filter(&self) -> crate::domain::Result<OrgFilter> {
        self.org.parse().map_err(AnalyticsError::Validation)
    }
}

/// Primary breakout column, its value, and the secondary filter
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Column to break results out by
    #[arg(long = "by")]
    pub filter_col: Option<String>,

    /// Keep only rows where the breakout column equals this value
    #[arg(long = "value", requires = "filter_col")]
    pub filter_value: Option<String>,

    /// Secondary filter value, e.g. Monday, 8A-5P or Alone
    #[arg(long)]
    pub secondary: Option<String>,
}

impl FilterArgs {
    pub fn to_spec(&self) -> crate::domain::Result<FilterSpec> {
        let mut spec = match &self.filter_col {
            Some(column) => FilterSpec::by_column(column)?,
            None => FilterSpec::default(),
        };
        if let Some(value) = &self.filter_value {
            spec = spec.with_value(value);
        }
        if let Some(secondary) = &self.secondary {
            spec = spec.with_secondary(secondary);
        }
        Ok(spec)
    }
}

/// Maps an engine error to the process exit code
pub fn exit_code(error: &AnalyticsError) -> i32 {
    match error {
        AnalyticsError::Configuration(_) => EXIT_CONFIG,
        e if e.is_caller_error() => EXIT_INVALID_INPUT,
        AnalyticsError::Store(StoreError::ConnectionFailed(_)) => EXIT_STORE_CONNECTION,
        _ => EXIT_FATAL,
    }
}

/// Prints an error to stderr and returns its exit code
pub fn report(error: &AnalyticsError) -> i32 {
    tracing::error!(error = %error, "Command failed");
    eprintln!("❌ {error}");
    exit_code(error)
}

/// Loads configuration and opens the configured event store
pub async fn open_service(config_path: &str) -> Result<(AnalyticsService, PaceMetricsConfig), i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Failed to load configuration file: {config_path}");
            eprintln!("   Error: {e}");
            return Err(EXIT_CONFIG);
        }
    };

    let store = match create_event_store(&config).await {
        Ok(s) => s,
        Err(e) => return Err(report(&e)),
    };

    tracing::debug!(backend = store.backend_name(), "Event store ready");
    Ok((AnalyticsService::new(store, &config), config))
}

/// Prints `value` as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            EXIT_OK
        }
        Err(e) => report(&AnalyticsError::from(e)),
    }
}

const NAME_WIDTH: usize = 24;
const CELL_WIDTH: usize = 10;

/// Renders a matrix as a fixed-width table, one row per series
pub fn render_matrix<T: Display>(matrix: &Matrix<T>) -> String {
    let mut out = format!("{:<NAME_WIDTH$}", "Series");
    for bucket in &matrix.buckets {
        out.push_str(&format!(" {:>CELL_WIDTH$}", bucket.to_string()));
    }
    out.push('\n');
    out.push_str(&"-".repeat(NAME_WIDTH + (CELL_WIDTH + 1) * matrix.buckets.len()));
    out.push('\n');

    if matrix.is_empty() {
        out.push_str("No data in range\n");
        return out;
    }

    for series in &matrix.series {
        let mut name = series.name.clone();
        if name.chars().count() > NAME_WIDTH {
            name = name.chars().take(NAME_WIDTH - 1).collect::<String>() + "…";
        }
        out.push_str(&format!("{name:<NAME_WIDTH$}"));
        for value in &series.values {
            out.push_str(&format!(" {:>CELL_WIDTH$}", value.to_string()));
        }
        out.push('\n');
    }
    out
}

/// Renders a census series as a two-column table
pub fn render_census(series: &DenominatorSeries) -> String {
    let mut out = format!("{:<CELL_WIDTH$} {:>CELL_WIDTH$}\n", "Period", "Census");
    out.push_str(&"-".repeat(CELL_WIDTH * 2 + 1));
    out.push('\n');
    for point in series.iter() {
        out.push_str(&format!(
            "{:<CELL_WIDTH$} {:>CELL_WIDTH$}\n",
            point.bucket.to_string(),
            point.census
        ));
    }
    out
}
