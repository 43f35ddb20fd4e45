// PACE Metrics - Utilization and incident analytics engine
// Copyright (c) 2025 PACE Metrics Contributors
// Licensed under the MIT License

//! # pacemetrics - census, utilization and incident analytics
//!
//! pacemetrics computes operational and clinical metrics for a managed-care
//! program: census, admissions, ER visits, incidents and grievances,
//! bucketed by month or quarter, filtered by organizational unit and
//! categorical attributes, and normalized into comparable rates.
//!
//! ## Overview
//!
//! This library provides:
//! - **Census** denominators (member-months) from enrollment intervals
//! - **Aggregation** of event rows into bucket × series matrices
//! - **Rates** per 100 member-months, with `N/A` for zero denominators
//! - **Outlier** detection and exclusion of repeat participants
//! - **Stable ordering** of series so colours match across related charts
//!
//! ## Architecture
//!
//! pacemetrics follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Analytics pipeline and entry points
//! - [`adapters`] - Event stores (PostgreSQL, in-memory fixture)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pacemetrics::adapters::store::create_event_store;
//! use pacemetrics::config::load_config;
//! use pacemetrics::core::service::AnalyticsService;
//! use pacemetrics::domain::{DateRange, Granularity, OrgFilter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("pacemetrics.toml")?;
//!     let store = create_event_store(&config).await?;
//!     let service = AnalyticsService::new(store, &config);
//!
//!     let range = DateRange::parse("01/01/2023", "03/31/2023")?;
//!     let census = service
//!         .census_series(&OrgFilter::All, &range, Granularity::Month)
//!         .await?;
//!
//!     for point in census.iter() {
//!         println!("{}: {}", point.bucket, point.census);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`]. Bad dates and
//! unknown filter values fail immediately; empty data and zero census do
//! not fail and show up in the result instead:
//!
//! ```rust
//! use pacemetrics::core::filter::FilterSpec;
//! use pacemetrics::domain::AnalyticsError;
//!
//! let err = FilterSpec::default().with_secondary("Someday").compile().unwrap_err();
//! assert!(matches!(err, AnalyticsError::InvalidFilter(_)));
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
