// PACE Metrics - Utilization and incident analytics CLI
// Copyright (c) 2025 PACE Metrics Contributors
// Licensed under the MIT License

use clap::Parser;
use pacemetrics::cli::{Cli, Commands};
use pacemetrics::config::load_config;
use pacemetrics::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging follows the config file when it loads; commands report
    // configuration errors themselves
    let config = if cli.command.needs_config() {
        load_config(&cli.config).ok()
    } else {
        None
    };
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let logging_config = config.map(|c| c.logging).unwrap_or_default();

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "pacemetrics - census, utilization and incident analytics"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    // process::exit skips destructors
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Census(args) => args.execute(&cli.config).await,
        Commands::Visits(args) => args.execute(&cli.config).await,
        Commands::Los(args) => args.execute(&cli.config).await,
        Commands::Readmit(args) => args.execute(&cli.config).await,
        Commands::Outliers(args) => args.execute(&cli.config).await,
        Commands::Summary(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
