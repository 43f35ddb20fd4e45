//! Domain models and types for pacemetrics.
//!
//! This module contains the core domain models, types, and business rules:
//! enrollment intervals, event records and categories, identifiers, calendar
//! helpers and the error hierarchy.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ParticipantId`], [`OrgUnit`], [`AttributeName`])
//! - **Domain models** ([`EnrollmentInterval`], [`EventRecord`], [`EventCategory`])
//! - **Calendar types** ([`DateRange`], [`Granularity`])
//! - **Error types** ([`AnalyticsError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so a participant ID can never be passed
//! where a unit name is expected:
//!
//! ```rust
//! use pacemetrics::domain::{OrgFilter, ParticipantId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let participant = ParticipantId::new("1001")?;
//! let org: OrgFilter = "Providence".parse()?;
//!
//! // let wrong: OrgFilter = participant;  // Compile error!
//! # let _ = (participant, org);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, AnalyticsError>`]:
//!
//! ```rust
//! use pacemetrics::domain::{DateRange, Result};
//!
//! fn example() -> Result<()> {
//!     // Date parsing failures are caller errors and surface immediately
//!     let range = DateRange::parse("01/01/2023", "03/31/2023")?;
//!     assert!(!range.is_empty());
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod dates;
pub mod enrollment;
pub mod errors;
pub mod event;
pub mod ids;
pub mod result;

// Re-export commonly used types for convenience
pub use dates::{parse_human_date, DateRange, Granularity};
pub use enrollment::EnrollmentInterval;
pub use errors::{AnalyticsError, StoreError};
pub use event::{columns, DateField, EventCategory, EventRecord, EventTable, Value};
pub use ids::{AttributeName, OrgFilter, OrgUnit, ParticipantId};
pub use result::Result;
