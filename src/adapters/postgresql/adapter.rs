//! PostgreSQL adapter implementing the event store trait
//!
//! Renders queries with [`sql`](super::sql), runs each on a fresh
//! [`PostgreSQLClient`] connection and decodes rows into domain records.

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::sql::{render_enrollment_query, render_event_query};
use crate::adapters::store::traits::EventStore;
use crate::core::query::EventQuery;
use crate::domain::{
    EnrollmentInterval, EventRecord, OrgFilter, OrgUnit, ParticipantId, Result, StoreError, Value,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tokio_postgres::types::Type;
use tokio_postgres::Row;

/// PostgreSQL implementation of [`EventStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl EventStore for PostgreSQLAdapter {
    fn backend_name(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    /// Union rows are tagged with the first branch's table; the date is
    /// stored under the query's date field.
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<EventRecord>> {
        let rendered = render_event_query(query)?;
        let rows = self.client.query(&rendered).await?;

        let selected = query.selected_columns();
        let table = query
            .source
            .branches()
            .first()
            .map(|(table, _)| *table)
            .ok_or_else(|| StoreError::UnsupportedQuery("query has no source table".into()))?;

        rows.iter()
            .map(|row| -> Result<EventRecord> {
                let participant = ParticipantId::new(text_at(row, 0)?.unwrap_or_default())
                    .map_err(StoreError::InvalidRow)?;
                let mut record = EventRecord::new(participant, table);

                if let Some(center) = text_at(row, 1)? {
                    record = record.with_unit(OrgUnit::new(center).map_err(StoreError::InvalidRow)?);
                }
                if let Some(date) = date_at(row, 2)? {
                    record = record.with_date(query.date_field, date);
                }
                for (offset, name) in selected.iter().enumerate() {
                    record = record.with_attribute(name.as_str(), value_at(row, offset + 3)?);
                }
                Ok(record)
            })
            .collect()
    }

    async fn fetch_enrollment(&self, org: &OrgFilter) -> Result<Vec<EnrollmentInterval>> {
        let rendered = render_enrollment_query(org);
        let rows = self.client.query(&rendered).await?;

        rows.iter()
            .map(|row| -> Result<EnrollmentInterval> {
                let participant = text_at(row, 0)?.unwrap_or_default();
                let unit = text_at(row, 1)?
                    .map(OrgUnit::new)
                    .transpose()
                    .map_err(StoreError::InvalidRow)?;
                let enrolled = date_at(row, 2)?.ok_or_else(|| {
                    StoreError::InvalidRow(format!(
                        "Participant {participant}: missing enrollment_date"
                    ))
                })?;
                let disenrolled = date_at(row, 3)?;

                Ok(EnrollmentInterval::new(participant, unit, enrolled, disenrolled)
                    .map_err(StoreError::InvalidRow)?)
            })
            .collect()
    }
}

fn decode_error(idx: usize, e: tokio_postgres::Error) -> StoreError {
    StoreError::InvalidRow(format!("column {idx}: {e}"))
}

fn text_at(row: &Row, idx: usize) -> Result<Option<String>> {
    Ok(row
        .try_get::<_, Option<String>>(idx)
        .map_err(|e| decode_error(idx, e))?)
}

fn date_at(row: &Row, idx: usize) -> Result<Option<NaiveDate>> {
    let ty = row.columns()[idx].type_().clone();
    let date = if ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(|e| decode_error(idx, e))?
            .map(|ts| ts.date())
    } else {
        row.try_get::<_, Option<NaiveDate>>(idx)
            .map_err(|e| decode_error(idx, e))?
    };
    Ok(date)
}

/// Decodes an attribute column by its declared type
fn value_at(row: &Row, idx: usize) -> Result<Value> {
    let ty = row.columns()[idx].type_().clone();
    let err = |e| decode_error(idx, e);

    let value = match ty {
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
            .try_get::<_, Option<String>>(idx)
            .map_err(err)?
            .map(Value::Text),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(err)?
            .map(|v| Value::Integer(v.into())),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(err)?
            .map(|v| Value::Integer(v.into())),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .map_err(err)?
            .map(Value::Integer),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(err)?
            .map(|v| Value::Number(v.into())),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .map_err(err)?
            .map(Value::Number),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .map_err(err)?
            .map(|v| Value::Integer(i64::from(v))),
        Type::DATE | Type::TIMESTAMP => date_at(row, idx)?.map(Value::Date),
        other => {
            return Err(StoreError::InvalidRow(format!(
                "column {} has unsupported type {}",
                row.columns()[idx].name(),
                other
            ))
            .into())
        }
    };

    Ok(value.unwrap_or(Value::Null))
}
