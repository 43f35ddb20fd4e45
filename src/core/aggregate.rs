//! Event aggregation
//!
//! Reads event rows for a category and pivots them into a bucket × series
//! matrix. With no breakout column the matrix holds a single
//! [`TOTAL_SERIES`]; otherwise one series per distinct column value.
//! Reads that return no rows produce an empty matrix, never an error.

use crate::adapters::store::EventStore;
use crate::core::filter::{is_binary_column, FilterSpec};
use crate::core::outliers::OutlierThreshold;
use crate::core::period::{Bucket, BucketKey, PeriodBucketer};
use crate::core::query::EventQuery;
use crate::domain::{
    columns, AttributeName, DateField, DateRange, EventCategory, EventRecord, Granularity,
    OrgFilter, Result,
};
use crate::{log_empty_result, log_query_complete, log_query_start};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Name of the series used when results are not broken out by a column
pub const TOTAL_SERIES: &str = "Total";

/// One named row of values, aligned with [`Matrix::buckets`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series<T> {
    pub name: String,
    pub values: Vec<T>,
}

impl<T> Series<T> {
    pub fn new(name: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Bucket × series table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix<T> {
    pub buckets: Vec<BucketKey>,
    pub series: Vec<Series<T>>,
}

/// Event counts per bucket and series
pub type CountMatrix = Matrix<u64>;

impl<T> Matrix<T> {
    /// Matrix with buckets but no series
    pub fn empty(buckets: Vec<BucketKey>) -> Self {
        Self {
            buckets,
            series: Vec::new(),
        }
    }

    pub fn from_series(buckets: Vec<BucketKey>, series: Vec<Series<T>>) -> Self {
        Self { buckets, series }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn series(&self, name: &str) -> Option<&Series<T>> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn series_names(&self) -> Vec<String> {
        self.series.iter().map(|s| s.name.clone()).collect()
    }

    /// Keeps the named series, in the given order
    ///
    /// Names absent from the matrix are skipped.
    pub fn reorder(mut self, order: &[String]) -> Self {
        let mut by_name: HashMap<String, Series<T>> = self
            .series
            .drain(..)
            .map(|s| (s.name.clone(), s))
            .collect();
        self.series = order.iter().filter_map(|name| by_name.remove(name)).collect();
        self
    }

    /// Applies `f` to every cell
    pub fn map<U, F>(&self, mut f: F) -> Matrix<U>
    where
        F: FnMut(&BucketKey, &T) -> U,
    {
        Matrix {
            buckets: self.buckets.clone(),
            series: self
                .series
                .iter()
                .map(|s| Series {
                    name: s.name.clone(),
                    values: self
                        .buckets
                        .iter()
                        .zip(&s.values)
                        .map(|(bucket, value)| f(bucket, value))
                        .collect(),
                })
                .collect(),
        }
    }
}

impl CountMatrix {
    /// Sum across series for each bucket
    pub fn bucket_totals(&self) -> Vec<u64> {
        (0..self.buckets.len())
            .map(|i| self.series.iter().map(|s| s.values[i]).sum())
            .collect()
    }

    /// Sum across buckets for each series, in series order
    pub fn series_totals(&self) -> Vec<(String, u64)> {
        self.series
            .iter()
            .map(|s| (s.name.clone(), s.values.iter().sum()))
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.series.iter().flat_map(|s| s.values.iter()).sum()
    }
}

/// Bucket index lookup for one aggregation
struct BucketIndex {
    granularity: Granularity,
    positions: HashMap<BucketKey, usize>,
}

impl BucketIndex {
    fn new(buckets: &[Bucket]) -> Self {
        let granularity = buckets
            .first()
            .map(|b| b.key.granularity())
            .unwrap_or(Granularity::Month);
        Self {
            granularity,
            positions: buckets.iter().enumerate().map(|(i, b)| (b.key, i)).collect(),
        }
    }

    fn position(&self, record: &EventRecord, field: DateField) -> Option<usize> {
        let date = record.date(field)?;
        self.positions
            .get(&BucketKey::containing(date, self.granularity))
            .copied()
    }
}

/// Series label of a row, or `None` when the breakout value is NULL
fn series_label(record: &EventRecord, series_column: Option<&AttributeName>) -> Option<String> {
    match series_column {
        None => Some(TOTAL_SERIES.to_string()),
        Some(column) => {
            let value = record.attribute(column.as_str());
            if value.is_null() {
                None
            } else {
                Some(value.label(is_binary_column(column)))
            }
        }
    }
}

/// Counts rows per bucket and series
///
/// Rows dated outside `buckets` and rows with a NULL breakout value are
/// dropped. Without a breakout column the result always has a zero-filled
/// [`TOTAL_SERIES`] so callers can render "no data".
pub fn pivot_counts(
    rows: &[EventRecord],
    buckets: &[Bucket],
    date_field: DateField,
    series_column: Option<&AttributeName>,
) -> CountMatrix {
    let index = BucketIndex::new(buckets);
    let keys: Vec<BucketKey> = buckets.iter().map(|b| b.key).collect();
    let mut table: BTreeMap<String, Vec<u64>> = BTreeMap::new();

    if series_column.is_none() {
        table.insert(TOTAL_SERIES.to_string(), vec![0; keys.len()]);
    }

    for record in rows {
        let (Some(i), Some(label)) = (
            index.position(record, date_field),
            series_label(record, series_column),
        ) else {
            continue;
        };
        table.entry(label).or_insert_with(|| vec![0; keys.len()])[i] += 1;
    }

    Matrix::from_series(
        keys,
        table
            .into_iter()
            .map(|(name, values)| Series::new(name, values))
            .collect(),
    )
}

/// How numeric values are combined within a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Sum,
    Mean,
}

/// Combines a numeric column per bucket and series
///
/// Cells without any non-NULL value are `None`.
pub fn pivot_values(
    rows: &[EventRecord],
    buckets: &[Bucket],
    date_field: DateField,
    series_column: Option<&AttributeName>,
    value_column: &str,
    reducer: Reducer,
) -> Matrix<Option<f64>> {
    let index = BucketIndex::new(buckets);
    let keys: Vec<BucketKey> = buckets.iter().map(|b| b.key).collect();
    let mut table: BTreeMap<String, Vec<(f64, u64)>> = BTreeMap::new();

    for record in rows {
        let (Some(i), Some(label), Some(value)) = (
            index.position(record, date_field),
            series_label(record, series_column),
            record.attribute(value_column).as_f64(),
        ) else {
            continue;
        };
        let cell = &mut table.entry(label).or_insert_with(|| vec![(0.0, 0); keys.len()])[i];
        cell.0 += value;
        cell.1 += 1;
    }

    Matrix::from_series(
        keys,
        table
            .into_iter()
            .map(|(name, cells)| {
                let values = cells
                    .into_iter()
                    .map(|(sum, n)| match (n, reducer) {
                        (0, _) => None,
                        (_, Reducer::Sum) => Some(sum),
                        (_, Reducer::Mean) => Some(sum / n as f64),
                    })
                    .collect();
                Series::new(name, values)
            })
            .collect(),
    )
}

/// Parameters shared by every bucketed chart
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest {
    pub category: EventCategory,
    pub date_field: DateField,
    pub org: OrgFilter,
    pub range: DateRange,
    pub granularity: Granularity,
    pub filter: FilterSpec,
}

impl AggregateRequest {
    pub fn new(category: EventCategory, range: DateRange, granularity: Granularity) -> Self {
        Self {
            category,
            date_field: category.default_date_field(),
            org: OrgFilter::All,
            range,
            granularity,
            filter: FilterSpec::default(),
        }
    }

    pub fn with_date_field(mut self, date_field: DateField) -> Self {
        self.date_field = date_field;
        self
    }

    pub fn with_org(mut self, org: OrgFilter) -> Self {
        self.org = org;
        self
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    /// Date field actually used for visit counts
    pub fn visit_date_field(&self) -> DateField {
        self.category.visit_date_field(self.date_field)
    }
}

/// Reads events and pivots them into matrices
#[derive(Clone)]
pub struct EventAggregator {
    store: Arc<dyn EventStore + Send + Sync>,
    bucketer: PeriodBucketer,
}

impl EventAggregator {
    pub fn new(store: Arc<dyn EventStore + Send + Sync>, bucketer: PeriodBucketer) -> Self {
        Self { store, bucketer }
    }

    pub fn bucketer(&self) -> &PeriodBucketer {
        &self.bucketer
    }

    /// Runs a read with timing and empty-result logging
    pub async fn fetch(&self, category: EventCategory, query: &EventQuery) -> Result<Vec<EventRecord>> {
        log_query_start!(category, &query.range);
        let started = Instant::now();

        let rows = self.store.fetch_events(query).await?;

        log_query_complete!(category, rows.len(), started.elapsed());
        if rows.is_empty() {
            log_empty_result!(category, &query.range);
        }
        Ok(rows)
    }

    /// Query counting visits for `request` over `range`
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` or `Validation` if the filter does not compile
    pub fn visit_query(&self, request: &AggregateRequest, range: DateRange) -> Result<EventQuery> {
        let compiled = request.filter.compile()?;
        Ok(EventQuery::new(
            request.category.visit_source(),
            request.visit_date_field(),
            range,
        )
        .with_predicate(compiled.predicate)
        .with_org(request.org.clone())
        .with_columns(request.filter.primary_column.clone())
        .with_columns(compiled.extra_columns))
    }

    /// Query reading admissions in `range`
    ///
    /// ER categories read inpatient admissions flagged `er = 1`, not ER
    /// visits, so stand-alone ER visits never count as admissions.
    pub fn admission_query(&self, request: &AggregateRequest, range: DateRange) -> Result<EventQuery> {
        let compiled = request.filter.compile()?;
        Ok(EventQuery::new(
            request.category.stay_source(),
            DateField::Admission,
            range,
        )
        .with_predicate(compiled.predicate)
        .with_org(request.org.clone())
        .with_columns(request.filter.primary_column.clone())
        .with_columns(compiled.extra_columns))
    }

    /// Query reading lengths of stay for discharges in `range`
    pub fn stay_query(&self, request: &AggregateRequest, range: DateRange) -> Result<EventQuery> {
        let compiled = request.filter.compile()?;
        Ok(EventQuery::new(
            request.category.stay_source(),
            DateField::Discharge,
            range,
        )
        .with_predicate(compiled.predicate)
        .with_org(request.org.clone())
        .with_columns(request.filter.primary_column.clone())
        .with_columns(compiled.extra_columns)
        .with_columns([known(columns::LOS)]))
    }

    /// Counts visits per bucket, broken out by the filter's primary column
    ///
    /// `exclusions` removes outlier participants before bucketing.
    pub async fn aggregate(
        &self,
        request: &AggregateRequest,
        exclusions: Option<&OutlierThreshold>,
    ) -> Result<CountMatrix> {
        let range = self.bucketer.normalize(&request.range, request.granularity);
        let buckets = self.bucketer.bucket_sequence(&range, request.granularity);
        let keys: Vec<BucketKey> = buckets.iter().map(|b| b.key).collect();
        if buckets.is_empty() {
            return Ok(Matrix::empty(keys));
        }

        let query = self.visit_query(request, range)?;
        let mut rows = self.fetch(request.category, &query).await?;
        if let Some(threshold) = exclusions {
            rows = threshold.exclude(rows);
        }

        Ok(pivot_counts(
            &rows,
            &buckets,
            query.date_field,
            request.filter.primary_column.as_ref(),
        ))
    }
}

/// Name of a built-in column
pub(crate) fn known(name: &'static str) -> AttributeName {
    AttributeName::new(name).unwrap_or_else(|e| unreachable!("{e}"))
}
