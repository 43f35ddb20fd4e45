//! In-memory event store
//!
//! Holds enrollment intervals and event records loaded from a JSON fixture
//! and evaluates [`EventQuery`] trees directly. Used for demos, offline
//! analysis of extracts, and tests.
//!
//! # Fixture format
//!
//! ```json
//! {
//!   "enrollment": [
//!     {"participant_id": "1001", "organizational_unit": "Westerly",
//!      "enrollment_date": "2022-01-01", "disenrollment_date": null}
//!   ],
//!   "events": [
//!     {"participant_id": "1001", "table": "er_only",
//!      "admission_date": "2023-02-03", "attributes": {"dow": "Friday"}}
//!   ]
//! }
//! ```
//!
//! Events without an `organizational_unit` inherit the unit of the
//! participant's enrollment row, mirroring the enrollment join a database
//! backend performs.

use crate::adapters::store::traits::EventStore;
use crate::core::query::EventQuery;
use crate::domain::{
    AnalyticsError, EnrollmentInterval, EventRecord, OrgFilter, OrgUnit, ParticipantId, Result,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    enrollment: Vec<EnrollmentInterval>,
    #[serde(default)]
    events: Vec<EventRecord>,
}

/// Event store backed by vectors in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    enrollment: Vec<EnrollmentInterval>,
    events: Vec<EventRecord>,
}

impl MemoryStore {
    /// Creates a store, filling missing event units from enrollment
    pub fn new(enrollment: Vec<EnrollmentInterval>, mut events: Vec<EventRecord>) -> Self {
        let units: HashMap<&ParticipantId, &OrgUnit> = enrollment
            .iter()
            .filter_map(|e| e.organizational_unit().map(|u| (e.participant_id(), u)))
            .collect();

        for event in events.iter_mut().filter(|e| e.organizational_unit.is_none()) {
            event.organizational_unit = units.get(&event.participant_id).map(|u| (*u).clone());
        }

        Self { enrollment, events }
    }

    /// Parses a JSON fixture
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if the JSON is malformed or a row
    /// fails validation
    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::new(fixture.enrollment, fixture.events))
    }

    /// Loads a JSON fixture file
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the file cannot be read, or a
    /// `Serialization` error if its contents are invalid
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AnalyticsError::Configuration(format!(
                "Failed to read fixture {}: {}",
                path.display(),
                e
            ))
        })?;
        let store = Self::from_json(&contents)?;

        tracing::debug!(
            path = %path.display(),
            enrollment = store.enrollment.len(),
            events = store.events.len(),
            "Loaded fixture"
        );
        Ok(store)
    }

    pub fn enrollment_len(&self) -> usize {
        self.enrollment.len()
    }

    pub fn events_len(&self) -> usize {
        self.events.len()
    }

    /// Copy of `record` holding only what a database backend would return
    fn project(query: &EventQuery, record: &EventRecord) -> EventRecord {
        let mut projected = EventRecord::new(record.participant_id.clone(), record.table);
        projected.organizational_unit = record.organizational_unit.clone();
        if let Some(date) = record.date(query.date_field) {
            projected = projected.with_date(query.date_field, date);
        }
        for name in query.selected_columns() {
            let value = record.attribute(name.as_str()).clone();
            projected = projected.with_attribute(name.as_str(), value);
        }
        projected
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "fixture"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<EventRecord>> {
        let branches = query.source.branches();
        let mut rows = Vec::new();

        for record in &self.events {
            let in_range = record
                .date(query.date_field)
                .is_some_and(|d| query.range.contains(d));
            if !in_range
                || !query.predicate.matches(record)
                || !query.org.admits(record.organizational_unit.as_ref())
            {
                continue;
            }

            // One row per admitting branch, as UNION ALL would return
            let copies = branches
                .iter()
                .filter(|(table, predicate)| record.table == *table && predicate.matches(record))
                .count();
            for _ in 0..copies {
                rows.push(Self::project(query, record));
            }
        }

        Ok(rows)
    }

    async fn fetch_enrollment(&self, org: &OrgFilter) -> Result<Vec<EnrollmentInterval>> {
        Ok(self
            .enrollment
            .iter()
            .filter(|e| org.admits(e.organizational_unit()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{Column, Predicate, Source};
    use crate::domain::{DateField, DateRange, EventCategory, EventTable};
    use chrono::NaiveDate;

    const FIXTURE: &str = r#"{
        "enrollment": [
            {"participant_id": "1", "organizational_unit": "Westerly", "enrollment_date": "2022-01-01"},
            {"participant_id": "2", "organizational_unit": "Providence", "enrollment_date": "2022-06-01",
             "disenrollment_date": "2023-03-15"}
        ],
        "events": [
            {"participant_id": "1", "table": "er_only", "admission_date": "2023-02-03",
             "attributes": {"dow": "Friday", "facility": "Kent"}},
            {"participant_id": "2", "table": "inpatient", "admission_date": "2023-02-10",
             "discharge_date": "2023-02-14",
             "attributes": {"er": 1, "admission_type": "Acute Hospital", "los": 4}},
            {"participant_id": "2", "table": "inpatient", "admission_date": "2023-02-20",
             "attributes": {"er": 0, "admission_type": "Acute Hospital"}}
        ]
    }"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn february() -> DateRange {
        DateRange::new(d(2023, 2, 1), d(2023, 2, 28))
    }

    #[tokio::test]
    async fn test_er_union_returns_both_tables() {
        let store = MemoryStore::from_json(FIXTURE).unwrap();
        let query = EventQuery::new(
            EventCategory::Er.visit_source(),
            DateField::Admission,
            february(),
        );
        let rows = store.fetch_events(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_units_inherited_from_enrollment() {
        let store = MemoryStore::from_json(FIXTURE).unwrap();
        let query = EventQuery::new(
            EventCategory::Inpatient.visit_source(),
            DateField::Admission,
            february(),
        )
        .with_org("Providence".parse().unwrap());
        assert_eq!(store.fetch_events(&query).await.unwrap().len(), 2);

        let westerly = query.with_org("Westerly".parse().unwrap());
        assert!(store.fetch_events(&westerly).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_projection_keeps_selected_columns_only() {
        let store = MemoryStore::from_json(FIXTURE).unwrap();
        let query = EventQuery::new(
            Source::Table(EventTable::ErOnly),
            DateField::Admission,
            february(),
        )
        .with_predicate(Predicate::equals(Column::known("dow"), "Friday"));

        let rows = store.fetch_events(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attribute("dow"), &"Friday".into());
        assert!(rows[0].attribute("facility").is_null());
        assert_eq!(rows[0].date(DateField::Admission), Some(d(2023, 2, 3)));
    }

    #[tokio::test]
    async fn test_fetch_enrollment_by_unit() {
        let store = MemoryStore::from_json(FIXTURE).unwrap();
        assert_eq!(store.fetch_enrollment(&OrgFilter::All).await.unwrap().len(), 2);
        let westerly = store
            .fetch_enrollment(&"westerly".parse().unwrap())
            .await
            .unwrap();
        assert!(westerly.is_empty());
    }

    #[test]
    fn test_invalid_enrollment_rejected() {
        let bad = r#"{"enrollment": [{"participant_id": "1", "enrollment_date": "2023-05-01",
            "disenrollment_date": "2023-04-01"}]}"#;
        assert!(matches!(
            MemoryStore::from_json(bad),
            Err(AnalyticsError::Serialization(_))
        ));
    }
}
