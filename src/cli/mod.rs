//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for pacemetrics using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// pacemetrics - census, utilization and incident analytics
#[derive(Parser, Debug)]
#[command(name = "pacemetrics")]
#[command(version, about, long_about = None)]
#[command(author = "PACE Metrics Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pacemetrics.toml", env = "PACEMETRICS_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PACEMETRICS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enrolled participants per month or quarter
    Census(commands::census::CensusArgs),

    /// Visit rates, shares or counts per bucket
    Visits(commands::visits::VisitsArgs),

    /// Length of stay per discharge bucket
    Los(commands::los::LosArgs),

    /// 30-day readmission rate
    Readmit(commands::readmit::ReadmitArgs),

    /// Repeat participants and the outlier threshold
    Outliers(commands::outliers::OutliersArgs),

    /// Scalar summary cards for one category
    Summary(commands::summary::SummaryArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Commands {
    /// Whether the command reads the configuration file
    pub fn needs_config(&self) -> bool {
        !matches!(self, Commands::Init(_))
    }
}
