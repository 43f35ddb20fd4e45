//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::common::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "pacemetrics.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing pacemetrics configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set store_target to 'postgresql' or 'fixture'");
                println!("  3. Put PACEMETRICS_DATABASE_URL in a .env file (PostgreSQL only)");
                println!("  4. Validate configuration: pacemetrics validate-config --check-connection");
                println!("  5. Try it: pacemetrics census --start 01/01/2023 --end 03/31/2023");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# pacemetrics configuration

# Event store (postgresql or fixture)
store_target = "postgresql"

[application]
log_level = "info"

[postgresql]
connection_string = "${PACEMETRICS_DATABASE_URL}"
ssl_mode = "prefer"

# [fixture]
# path = "demos/fixture.json"

[period]
month_end_cutoff_day = 22

[census]
as_of_first = true

[rates]
decimals = 2

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r##"# pacemetrics configuration
#
# Census, utilization and incident analytics over a reporting database.
# Values of the form ${NAME} are replaced from the environment before
# parsing, and PACEMETRICS_* variables override individual settings.

# ============================================================================
# Event Store Selection
# ============================================================================
# postgresql: reporting database with enrollment and event tables
# fixture:    JSON file loaded into memory (demos, offline extracts, tests)
store_target = "postgresql"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# PostgreSQL
# ============================================================================
[postgresql]
# postgresql://[user[:password]@][host][:port][/dbname]
connection_string = "${PACEMETRICS_DATABASE_URL}"

# Seconds to wait for a connection
connect_timeout_seconds = 30

# Per-statement limit in seconds (0 = no limit)
statement_timeout_seconds = 0

# disable | prefer | require
ssl_mode = "prefer"

# ============================================================================
# Fixture
# ============================================================================
# [fixture]
# path = "demos/fixture.json"

# ============================================================================
# Period Bucketing
# ============================================================================
[period]
# End dates before this day of the month drop their (partial) month
month_end_cutoff_day = 22

# ============================================================================
# Census
# ============================================================================
[census]
# true: enrolled on the 1st of the month; false: on the last day
as_of_first = true

# ============================================================================
# Rates
# ============================================================================
[rates]
# Decimal places for rates and averages (0-6)
decimals = 2

# ============================================================================
# Series Palette
# ============================================================================
[palette]
# Series N is drawn with colour N; colours repeat when exhausted
colors = [
    "#00B760", "#8DCC8F", "#442359", "#775F86", "#6EA4BF", "#CADDE7", "#F06449",
    "#F6AA9B", "#EF934C", "#F6C49D", "#191919", "#6C6C6C", "#F2C14E", "#F6D78E",
]

# ============================================================================
# Logging
# ============================================================================
[logging]
# Write JSON logs to rolling files in addition to the console
local_enabled = false

# Directory for log files
local_path = "./logs"

# Rotation (daily, hourly, never)
local_rotation = "daily"
"##
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "pacemetrics.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "pacemetrics.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generated_configs_parse() {
        std::env::set_var("PACEMETRICS_DATABASE_URL", "postgresql://u:p@localhost/reporting");

        let minimal = parse_config(&InitArgs::generate_minimal_config()).unwrap();
        assert_eq!(minimal.period.month_end_cutoff_day, 22);

        let full = parse_config(&InitArgs::generate_config_with_examples()).unwrap();
        assert_eq!(full.palette.colors.len(), 14);
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = InitArgs {
            output: file.path().display().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), EXIT_CONFIG);
    }
}
