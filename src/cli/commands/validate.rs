//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the pacemetrics configuration file.

use super::common::{exit_code, EXIT_CONFIG, EXIT_OK};
use crate::adapters::store::create_event_store;
use crate::config::{load_config, redact_connection_string, StoreTarget};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also open a connection to the configured event store
    #[arg(long)]
    pub check_connection: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section before returning
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        match config.store_target {
            StoreTarget::PostgreSQL => {
                if let Some(ref pg) = config.postgresql {
                    println!("  Store: PostgreSQL");
                    println!(
                        "  Connection: {}",
                        redact_connection_string(&pg.connection_string)
                    );
                    println!("  SSL Mode: {}", pg.ssl_mode);
                    println!("  Statement Timeout: {}s", pg.statement_timeout_seconds);
                }
            }
            StoreTarget::Fixture => {
                if let Some(ref fixture) = config.fixture {
                    println!("  Store: fixture");
                    println!("  Fixture Path: {}", fixture.path);
                }
            }
        }
        println!(
            "  Month End Cutoff Day: {}",
            config.period.month_end_cutoff_day
        );
        println!(
            "  Census Reference: {}",
            if config.census.as_of_first {
                "first of month"
            } else {
                "end of month"
            }
        );
        println!("  Rate Decimals: {}", config.rates.decimals);
        println!("  Palette Colours: {}", config.palette.colors.len());
        println!();

        if !self.check_connection {
            return Ok(EXIT_OK);
        }

        let outcome = match create_event_store(&config).await {
            Ok(store) => store.test_connection().await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                println!("✅ Event store connection succeeded");
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Event store connection failed");
                println!("   Error: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}
