//! Event store integrations for pacemetrics.
//!
//! This module provides the backends the analytics engine reads from:
//!
//! - [`store`] - Event store abstraction (trait-based) and factory
//! - [`postgresql`] - PostgreSQL reporting database
//! - [`memory`] - In-memory store loaded from a JSON fixture
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing against the in-memory store. The analytics service only sees
//! `Arc<dyn EventStore + Send + Sync>`.
//!
//! # Fixture Store
//!
//! ```rust
//! use pacemetrics::adapters::memory::MemoryStore;
//! use pacemetrics::adapters::store::EventStore;
//! use pacemetrics::domain::OrgFilter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::from_json(
//!     r#"{"enrollment": [{"participant_id": "1001", "enrollment_date": "2022-01-01"}]}"#,
//! )?;
//! let enrolled = store.fetch_enrollment(&OrgFilter::All).await?;
//! assert_eq!(enrolled.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgresql;
pub mod store;
