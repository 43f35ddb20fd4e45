//! Event store trait definitions
//!
//! This module defines the read interface that every event store backend
//! implements. The analytics core only talks to stores through this trait.

use crate::core::query::EventQuery;
use crate::domain::{EnrollmentInterval, EventRecord, OrgFilter, Result};
use async_trait::async_trait;

/// Read access to enrollment and event rows
///
/// Implementations must be safe to share across tasks; the analytics
/// service issues independent reads concurrently.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Short backend name used in logs
    fn backend_name(&self) -> &'static str;

    /// Test connectivity to the store
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached
    async fn test_connection(&self) -> Result<()>;

    /// Fetch the event rows selected by `query`
    ///
    /// Returned records carry the participant, organizational unit, the
    /// query's date field and every column in
    /// [`EventQuery::selected_columns`]. Union sources return rows from
    /// every branch, duplicates included.
    ///
    /// # Errors
    ///
    /// Returns a `Store` error if the query fails or cannot be expressed
    /// by the backend
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<EventRecord>>;

    /// Fetch enrollment intervals, restricted to one unit unless `org` is `All`
    ///
    /// # Errors
    ///
    /// Returns a `Store` error if the query fails or a row is malformed
    async fn fetch_enrollment(&self, org: &OrgFilter) -> Result<Vec<EnrollmentInterval>>;
}
