//! PostgreSQL event store
//!
//! Reads enrollment and event tables from the reporting database.

pub mod adapter;
pub mod client;
pub mod sql;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use sql::{render_enrollment_query, render_event_query, RenderedQuery};
