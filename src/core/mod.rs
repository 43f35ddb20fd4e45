//! Core analytics engine for pacemetrics.
//!
//! This module holds the aggregation pipeline: period bucketing, census
//! denominators, filter compilation, event aggregation, outlier detection,
//! rate normalization and series ordering.
//!
//! # Modules
//!
//! - [`period`] - Month/quarter normalization and bucket sequences
//! - [`census`] - Member-month denominators from enrollment intervals
//! - [`query`] - Typed query tree rendered by each store backend
//! - [`filter`] - Primary/secondary filter compilation
//! - [`aggregate`] - Reads events and pivots them into bucket × series matrices
//! - [`outliers`] - Repeat participants and mean + 1 SD exclusion
//! - [`rates`] - Per-100-member-month rates, percentages and `N/A` handling
//! - [`ordering`] - Stable series order, top-N truncation and colours
//! - [`service`] - Entry points, one per chart family or summary card
//!
//! # Workflow
//!
//! 1. **Normalize**: trim the caller's range to whole months or quarters
//! 2. **Compile**: turn the filter selection into a predicate
//! 3. **Exclude** (optional): compute the outlier threshold and drop rows
//! 4. **Aggregate**: read events and pivot into a count matrix
//! 5. **Normalize rates**: divide by the census of each bucket
//! 6. **Order**: rank series from the unfiltered baseline and truncate
//!
//! # Example
//!
//! ```rust,no_run
//! use pacemetrics::adapters::store::create_event_store;
//! use pacemetrics::config::load_config;
//! use pacemetrics::core::aggregate::AggregateRequest;
//! use pacemetrics::core::service::{AnalyticsService, VisitRateRequest};
//! use pacemetrics::domain::{DateRange, EventCategory, Granularity};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pacemetrics.toml")?;
//! let store = create_event_store(&config).await?;
//! let service = AnalyticsService::new(store, &config);
//!
//! let range = DateRange::parse("01/01/2023", "06/30/2023")?;
//! let request = AggregateRequest::new(EventCategory::Er, range, Granularity::Month);
//! let chart = service.visit_rate(&VisitRateRequest::new(request)).await?;
//!
//! for series in &chart.values.series {
//!     println!("{}: {:?}", series.name, series.values);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod census;
pub mod filter;
pub mod ordering;
pub mod outliers;
pub mod period;
pub mod query;
pub mod rates;
pub mod service;
