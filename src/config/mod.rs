//! Configuration management for pacemetrics.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! pacemetrics uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PACEMETRICS_*` environment overrides applied after parsing
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pacemetrics::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pacemetrics.toml")?;
//!
//! println!("Store: {:?}", config.store_target);
//! println!("Month cutoff day: {}", config.period.month_end_cutoff_day);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`PostgreSQLConfig`] - Reporting database connection
//! - [`FixtureConfig`] - JSON fixture used instead of a database
//! - [`PeriodConfig`] - Trailing partial month cutoff
//! - [`CensusConfig`] - Monthly census reference day
//! - [`RatesConfig`] - Rounding of rates
//! - [`PaletteConfig`] - Ordered series colours
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! store_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [postgresql]
//! connection_string = "${PACEMETRICS_DATABASE_URL}"
//! ssl_mode = "require"
//!
//! [period]
//! month_end_cutoff_day = 22
//!
//! [census]
//! as_of_first = true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CensusConfig, FixtureConfig, LoggingConfig, PaceMetricsConfig,
    PaletteConfig, PeriodConfig, PostgreSQLConfig, RatesConfig, StoreTarget,
};
pub use secret::{redact_connection_string, secret_string, SecretString, SecretValue};
