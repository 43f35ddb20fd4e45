//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{FixtureConfig, PaceMetricsConfig, StoreTarget};
use super::secret::secret_string;
use crate::domain::errors::AnalyticsError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into PaceMetricsConfig
/// 4. Applies environment variable overrides (PACEMETRICS_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if the file is missing or unreadable, the
/// TOML is malformed, a referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use pacemetrics::config::loader::load_config;
///
/// let config = load_config("pacemetrics.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PaceMetricsConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(AnalyticsError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AnalyticsError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<PaceMetricsConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PaceMetricsConfig = toml::from_str(&contents)
        .map_err(|e| AnalyticsError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        AnalyticsError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|m| m == name) {
                        missing_vars.push(name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(AnalyticsError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        AnalyticsError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies environment variable overrides using the PACEMETRICS_* prefix
///
/// Variables follow the pattern PACEMETRICS_<SECTION>_<KEY>, for example
/// PACEMETRICS_POSTGRESQL_CONNECTION_STRING or PACEMETRICS_PERIOD_MONTH_END_CUTOFF_DAY.
fn apply_env_overrides(config: &mut PaceMetricsConfig) -> Result<()> {
    if let Ok(val) = std::env::var("PACEMETRICS_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("PACEMETRICS_STORE_TARGET") {
        config.store_target = match val.trim().to_lowercase().as_str() {
            "postgresql" => StoreTarget::PostgreSQL,
            "fixture" => StoreTarget::Fixture,
            other => {
                return Err(AnalyticsError::Configuration(format!(
                    "Invalid PACEMETRICS_STORE_TARGET '{other}'. Must be postgresql or fixture"
                )))
            }
        };
    }

    // PostgreSQL overrides (only if the section is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("PACEMETRICS_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("PACEMETRICS_POSTGRESQL_CONNECT_TIMEOUT_SECONDS") {
            pg.connect_timeout_seconds =
                parse_override("PACEMETRICS_POSTGRESQL_CONNECT_TIMEOUT_SECONDS", &val)?;
        }
        if let Ok(val) = std::env::var("PACEMETRICS_POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
    }

    if let Ok(val) = std::env::var("PACEMETRICS_FIXTURE_PATH") {
        config.fixture = Some(FixtureConfig { path: val });
    }

    if let Ok(val) = std::env::var("PACEMETRICS_PERIOD_MONTH_END_CUTOFF_DAY") {
        config.period.month_end_cutoff_day =
            parse_override("PACEMETRICS_PERIOD_MONTH_END_CUTOFF_DAY", &val)?;
    }
    if let Ok(val) = std::env::var("PACEMETRICS_CENSUS_AS_OF_FIRST") {
        config.census.as_of_first = parse_override("PACEMETRICS_CENSUS_AS_OF_FIRST", &val)?;
    }
    if let Ok(val) = std::env::var("PACEMETRICS_RATES_DECIMALS") {
        config.rates.decimals = parse_override("PACEMETRICS_RATES_DECIMALS", &val)?;
    }

    if let Ok(val) = std::env::var("PACEMETRICS_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("PACEMETRICS_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("PACEMETRICS_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
