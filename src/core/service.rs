//! Computation entry points
//!
//! [`AnalyticsService`] wires the bucketer, census calculator, aggregator,
//! outlier detector, rate normalizer and palette together. Each method is
//! one chart family or summary card and recomputes from the store.

use crate::adapters::store::EventStore;
use crate::config::PaceMetricsConfig;
use crate::core::aggregate::{
    known, pivot_values, AggregateRequest, CountMatrix, EventAggregator, Matrix, Reducer,
};
use crate::core::census::{CensusCalculator, CensusPolicy, DenominatorSeries};
use crate::core::filter::FilterSpec;
use crate::core::ordering::{apply_order, display_order, stable_order, SeriesPalette, SeriesStyle, TopN};
use crate::core::outliers::{OutlierDetector, OutlierSummary, OutlierThreshold, RepeatCounts};
use crate::core::period::PeriodBucketer;
use crate::core::query::{er_to_acute_admissions, Column, EventQuery, Predicate};
use crate::core::rates::{RateNormalizer, RateValue, ReadmitRate};
use crate::domain::{
    columns, AnalyticsError, DateField, DateRange, EventCategory, EventRecord, Granularity,
    OrgFilter, Result, Value,
};
use crate::log_degenerate_threshold;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default readmission window in days
pub const READMIT_WINDOW_DAYS: u32 = 30;

/// What a visit chart plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitMeasure {
    /// Visits per 100 member-months
    #[default]
    Per100mm,
    /// Share of the bucket's visits across every value of the breakout column
    PercentOfTotal,
    /// Raw visit counts
    Count,
}

impl fmt::Display for VisitMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VisitMeasure::Per100mm => "per_100mm",
            VisitMeasure::PercentOfTotal => "percent_of_total",
            VisitMeasure::Count => "count",
        })
    }
}

impl FromStr for VisitMeasure {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "per_100mm" | "pmpm" | "rate" => Ok(VisitMeasure::Per100mm),
            "percent_of_total" | "percent" => Ok(VisitMeasure::PercentOfTotal),
            "count" | "total" => Ok(VisitMeasure::Count),
            other => Err(AnalyticsError::Validation(format!(
                "Unknown measure '{other}'. Expected per_100mm, percent_of_total or count"
            ))),
        }
    }
}

/// Skilled nursing facility stay type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StayType {
    Skilled,
    Custodial,
    Respite,
}

impl StayType {
    /// Value stored in the `admit_reason` column
    pub fn as_str(&self) -> &'static str {
        match self {
            StayType::Skilled => "Skilled",
            StayType::Custodial => "Custodial",
            StayType::Respite => "Respite",
        }
    }
}

impl FromStr for StayType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skilled" => Ok(StayType::Skilled),
            "custodial" => Ok(StayType::Custodial),
            "respite" => Ok(StayType::Respite),
            other => Err(AnalyticsError::Validation(format!(
                "Unknown stay type '{other}'. Expected skilled, custodial or respite"
            ))),
        }
    }
}

/// Options for [`AnalyticsService::visit_rate`]
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRateRequest {
    pub aggregate: AggregateRequest,
    pub measure: VisitMeasure,
    pub top_n: TopN,
    pub remove_outliers: bool,
}

impl VisitRateRequest {
    pub fn new(aggregate: AggregateRequest) -> Self {
        Self {
            aggregate,
            measure: VisitMeasure::default(),
            top_n: TopN::default(),
            remove_outliers: false,
        }
    }

    pub fn with_measure(mut self, measure: VisitMeasure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_top_n(mut self, top_n: TopN) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn without_outliers(mut self) -> Self {
        self.remove_outliers = true;
        self
    }
}

/// Bucketed visit chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRateResult {
    pub measure: VisitMeasure,
    /// Plotted values, in display order
    pub values: Matrix<RateValue>,
    /// Raw counts behind `values`, in display order
    pub counts: CountMatrix,
    /// Member-month denominators; present for `per_100mm`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub census: Option<DenominatorSeries>,
    /// Baseline order before intersection and truncation
    pub order: Vec<String>,
    pub styles: Vec<SeriesStyle>,
}

/// Bucketed length-of-stay chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthOfStayResult {
    pub reducer: Reducer,
    /// Days per bucket and series; `N/A` where nothing was discharged
    pub values: Matrix<RateValue>,
    pub order: Vec<String>,
    pub styles: Vec<SeriesStyle>,
}

/// ER visits and the share that became acute admissions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErToInpatient {
    /// Stand-alone ER visits plus admissions through the ER
    pub er_visits: u64,
    /// Acute hospital admissions flagged as arriving through the ER
    pub er_to_acute: u64,
    pub percent: RateValue,
}

/// Scalar cards for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scorecard {
    pub category: EventCategory,
    pub range: DateRange,
    pub total_census: u64,
    pub event_total: u64,
    pub events_per_100mm: RateValue,
    pub percent_without_event: RateValue,
    pub outliers: OutlierSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alos: Option<RateValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub los_per_100mm: Option<RateValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readmit: Option<ReadmitRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub er_to_inpatient: Option<ErToInpatient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severe_events: Option<u64>,
}

/// Analytics entry points over one event store
#[derive(Clone)]
pub struct AnalyticsService {
    aggregator: EventAggregator,
    census: CensusCalculator,
    outliers: OutlierDetector,
    normalizer: RateNormalizer,
    palette: SeriesPalette,
    as_of_first: bool,
}

impl AnalyticsService {
    /// Builds the service from configuration
    pub fn new(store: Arc<dyn EventStore + Send + Sync>, config: &PaceMetricsConfig) -> Self {
        Self::from_parts(
            store,
            PeriodBucketer::new(config.period.month_end_cutoff_day),
            RateNormalizer::new(config.rates.decimals),
            SeriesPalette::from(&config.palette),
            config.census.as_of_first,
        )
    }

    pub fn from_parts(
        store: Arc<dyn EventStore + Send + Sync>,
        bucketer: PeriodBucketer,
        normalizer: RateNormalizer,
        palette: SeriesPalette,
        as_of_first: bool,
    ) -> Self {
        let aggregator = EventAggregator::new(store.clone(), bucketer);
        Self {
            census: CensusCalculator::new(store, bucketer),
            outliers: OutlierDetector::new(aggregator.clone()),
            aggregator,
            normalizer,
            palette,
            as_of_first,
        }
    }

    /// Service with default settings, mainly for tests and demos
    pub fn with_defaults(store: Arc<dyn EventStore + Send + Sync>) -> Self {
        Self::from_parts(
            store,
            PeriodBucketer::default(),
            RateNormalizer::default(),
            SeriesPalette::default(),
            true,
        )
    }

    pub fn normalizer(&self) -> &RateNormalizer {
        &self.normalizer
    }

    fn member_month_policy(&self) -> CensusPolicy {
        CensusPolicy::member_months(self.as_of_first)
    }

    /// Enrolled participants per bucket
    ///
    /// Months count as of the configured reference day; quarters count
    /// anyone enrolled during the quarter.
    pub async fn census_series(
        &self,
        org: &OrgFilter,
        range: &DateRange,
        granularity: Granularity,
    ) -> Result<DenominatorSeries> {
        self.census
            .census_series(org, range, granularity, CensusPolicy::new(self.as_of_first, false))
            .await
    }

    /// Outlier threshold over `range`, or `None` when outliers are kept
    async fn exclusions(
        &self,
        remove_outliers: bool,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
    ) -> Result<Option<OutlierThreshold>> {
        if !remove_outliers {
            return Ok(None);
        }
        Ok(Some(self.outliers.threshold(category, org, range).await?))
    }

    /// Bucketed visit counts, rates or shares with a stable series order
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` for an unknown secondary filter value, and
    /// store errors from the reads. Empty data and zero census are not errors.
    pub async fn visit_rate(&self, request: &VisitRateRequest) -> Result<VisitRateResult> {
        let req = &request.aggregate;
        // Threshold and pruned rows share the normalized window
        let window = self.aggregator.bucketer().normalize(&req.range, req.granularity);
        let exclusions = self
            .exclusions(request.remove_outliers, req.category, &req.org, &window)
            .await?;
        let baseline_request = req.clone().with_filter(req.filter.baseline());

        let census_read = async {
            match request.measure {
                VisitMeasure::Per100mm => self
                    .census
                    .census_series(&req.org, &req.range, req.granularity, self.member_month_policy())
                    .await
                    .map(Some),
                _ => Ok(None),
            }
        };

        let (counts, baseline, census) = tokio::try_join!(
            self.aggregator.aggregate(req, exclusions.as_ref()),
            self.aggregator.aggregate(&baseline_request, exclusions.as_ref()),
            census_read,
        )?;

        let values = match (&request.measure, &census) {
            (VisitMeasure::Per100mm, Some(census)) => self.normalizer.normalize(&counts, census),
            (VisitMeasure::PercentOfTotal, _) => {
                self.normalizer.percent_of_total(&counts, &baseline.bucket_totals())
            }
            _ => counts.map(|_, count| RateValue::Value(*count as f64)),
        };

        let order = stable_order(&baseline);
        let shown = display_order(&order, &counts.series_names(), request.top_n);

        tracing::info!(
            category = %req.category,
            measure = %request.measure,
            buckets = counts.buckets.len(),
            series = shown.len(),
            "Computed visit chart"
        );

        Ok(VisitRateResult {
            measure: request.measure,
            values: apply_order(values, &shown),
            counts: apply_order(counts, &shown),
            census,
            styles: self.palette.styles(&shown),
            order,
        })
    }

    /// Mean or total length of stay per discharge bucket
    pub async fn length_of_stay(
        &self,
        request: &AggregateRequest,
        reducer: Reducer,
        top_n: TopN,
        remove_outliers: bool,
    ) -> Result<LengthOfStayResult> {
        let range = self
            .aggregator
            .bucketer()
            .normalize(&request.range, request.granularity);
        let exclusions = self
            .exclusions(remove_outliers, request.category, &request.org, &range)
            .await?;
        let buckets = self
            .aggregator
            .bucketer()
            .bucket_sequence(&range, request.granularity);
        let query = self.aggregator.stay_query(request, range)?;
        let baseline_request = request.clone().with_filter(request.filter.baseline());

        let (mut rows, baseline) = tokio::try_join!(
            self.aggregator.fetch(request.category, &query),
            self.aggregator.aggregate(&baseline_request, exclusions.as_ref()),
        )?;
        if let Some(threshold) = &exclusions {
            rows = threshold.exclude(rows);
        }

        let days = pivot_values(
            &rows,
            &buckets,
            DateField::Discharge,
            request.filter.primary_column.as_ref(),
            columns::LOS,
            reducer,
        );
        let values = days.map(|_, cell| match cell {
            Some(v) => RateValue::Value(self.normalizer.round(*v)),
            None => RateValue::NotAvailable,
        });

        let order = stable_order(&baseline);
        let shown = display_order(&order, &values.series_names(), top_n);

        Ok(LengthOfStayResult {
            reducer,
            values: apply_order(values, &shown),
            styles: self.palette.styles(&shown),
            order,
        })
    }

    /// Readmissions within `window_days` of the previous admission
    ///
    /// Same-day readmissions (`0` days) are admissions but not readmissions.
    /// The denominator is admissions, not census.
    pub async fn readmit_rate(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
        window_days: u32,
        filter: &FilterSpec,
    ) -> Result<ReadmitRate> {
        require_admission(category, "readmission rate")?;
        let request = AggregateRequest::new(category, *range, Granularity::Month)
            .with_org(org.clone())
            .with_filter(filter.clone());
        let query = self
            .aggregator
            .admission_query(&request, *range)?
            .with_columns([known(columns::DAYS_SINCE_LAST_ADMISSION)]);
        let rows = self.aggregator.fetch(category, &query).await?;

        let readmissions = rows
            .iter()
            .filter(|row| {
                row.attribute(columns::DAYS_SINCE_LAST_ADMISSION)
                    .as_f64()
                    .is_some_and(|days| days >= 1.0 && days <= f64::from(window_days))
            })
            .count() as u64;

        Ok(self.normalizer.readmit_rate(readmissions, rows.len() as u64))
    }

    /// Repeat-participant summary
    pub async fn outlier_summary(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
    ) -> Result<OutlierSummary> {
        self.outliers
            .summary(category, org, range, &self.normalizer)
            .await
    }

    /// Participants enrolled on any day of the range
    pub async fn total_census(&self, org: &OrgFilter, range: &DateRange) -> Result<u64> {
        self.census.total_census(org, range).await
    }

    async fn category_rows(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
    ) -> Result<Vec<EventRecord>> {
        let query = EventQuery::new(category.visit_source(), category.default_date_field(), *range)
            .with_org(org.clone());
        self.aggregator.fetch(category, &query).await
    }

    /// Events in range, optionally without those of outlier participants
    pub async fn event_total(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
        remove_outliers: bool,
    ) -> Result<u64> {
        let rows = self.category_rows(category, org, range).await?;
        if !remove_outliers {
            return Ok(rows.len() as u64);
        }

        let counts = RepeatCounts::from_rows(&rows);
        let threshold = OutlierThreshold::from_counts(&counts);
        if threshold.threshold.is_none() {
            log_degenerate_threshold!(category, counts.repeaters.len());
        }
        Ok(threshold.exclude(rows).len() as u64)
    }

    /// Events per 100 member-months over the whole range
    pub async fn events_per_100mm(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
        remove_outliers: bool,
    ) -> Result<RateValue> {
        let (events, member_months) = tokio::try_join!(
            self.event_total(category, org, range, remove_outliers),
            self.census.member_months(org, range, self.member_month_policy()),
        )?;
        Ok(self.normalizer.per_100(events as f64, member_months))
    }

    /// Share of participants enrolled during the range with no event
    pub async fn percent_without_event(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
    ) -> Result<RateValue> {
        let (rows, total) = tokio::try_join!(
            self.category_rows(category, org, range),
            self.census.total_census(org, range),
        )?;
        let with_event: HashSet<_> = rows.iter().map(|r| &r.participant_id).collect();
        let without = total.saturating_sub(with_event.len() as u64);
        Ok(self.normalizer.percent(without as f64, total as f64))
    }

    /// ER visits and the acute admissions that came through the ER
    pub async fn er_to_inpatient(
        &self,
        org: &OrgFilter,
        range: &DateRange,
        filter: &FilterSpec,
    ) -> Result<ErToInpatient> {
        let compiled = filter.compile()?;
        let er_request = AggregateRequest::new(EventCategory::Er, *range, Granularity::Month)
            .with_org(org.clone())
            .with_filter(filter.clone());
        let visits_query = self.aggregator.visit_query(&er_request, *range)?;
        let acute_query = EventQuery::new(er_to_acute_admissions(), DateField::Admission, *range)
            .with_predicate(compiled.predicate)
            .with_org(org.clone())
            .with_columns(filter.primary_column.clone())
            .with_columns(compiled.extra_columns);

        let (visits, acute) = tokio::try_join!(
            self.aggregator.fetch(EventCategory::Er, &visits_query),
            self.aggregator.fetch(EventCategory::Inpatient, &acute_query),
        )?;

        let er_visits = visits.len() as u64;
        let er_to_acute = acute.len() as u64;
        Ok(ErToInpatient {
            er_visits,
            er_to_acute,
            percent: self.normalizer.percent(er_to_acute as f64, er_visits as f64),
        })
    }

    async fn stay_rows(
        &self,
        request: &AggregateRequest,
        extra: Predicate,
    ) -> Result<Vec<EventRecord>> {
        let query = self
            .aggregator
            .stay_query(request, request.range)?
            .with_predicate(extra);
        let rows = self.aggregator.fetch(request.category, &query).await?;
        Ok(rows)
    }

    fn los_values(rows: &[EventRecord]) -> Vec<f64> {
        rows.iter()
            .filter_map(|r| r.attribute(columns::LOS).as_f64())
            .collect()
    }

    /// Average length of stay of discharges in range
    pub async fn alos(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
        filter: &FilterSpec,
    ) -> Result<RateValue> {
        require_admission(category, "average length of stay")?;
        let request = stay_request(category, org, range, filter);
        let los = Self::los_values(&self.stay_rows(&request, Predicate::Always).await?);
        if los.is_empty() {
            return Ok(RateValue::NotAvailable);
        }
        let mean = los.iter().sum::<f64>() / los.len() as f64;
        Ok(RateValue::Value(self.normalizer.round(mean)))
    }

    async fn days_per_100mm(&self, request: &AggregateRequest, extra: Predicate) -> Result<RateValue> {
        let (rows, member_months) = tokio::try_join!(
            self.stay_rows(request, extra),
            self.census
                .member_months(&request.org, &request.range, self.member_month_policy()),
        )?;
        let los = Self::los_values(&rows);
        if los.is_empty() {
            return Ok(RateValue::NotAvailable);
        }
        Ok(self.normalizer.per_100(los.iter().sum(), member_months))
    }

    /// Inpatient days per 100 member-months
    pub async fn los_per_100mm(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
        filter: &FilterSpec,
    ) -> Result<RateValue> {
        require_admission(category, "length of stay")?;
        self.days_per_100mm(&stay_request(category, org, range, filter), Predicate::Always)
            .await
    }

    /// Skilled nursing days of one stay type per 100 member-months
    ///
    /// Only the primary filter applies; the stay type occupies the
    /// `admit_reason` column a secondary filter would use.
    pub async fn stay_days_per_100mm(
        &self,
        stay_type: StayType,
        org: &OrgFilter,
        range: &DateRange,
        filter: &FilterSpec,
    ) -> Result<RateValue> {
        let primary_only = FilterSpec {
            secondary_value: None,
            ..filter.clone()
        };
        let request = stay_request(EventCategory::InpatientSnf, org, range, &primary_only);
        let by_type = Predicate::equals(Column::known(columns::ADMIT_REASON), stay_type.as_str());
        self.days_per_100mm(&request, by_type).await
    }

    /// Incidents at the most severe level
    ///
    /// # Errors
    ///
    /// Returns `Validation` for categories without a severity scale,
    /// including infections.
    pub async fn severe_event_count(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
    ) -> Result<u64> {
        let predicate = severe_predicate(category).ok_or_else(|| {
            AnalyticsError::Validation(format!("'{category}' has no severity scale"))
        })?;
        let query = EventQuery::new(category.visit_source(), DateField::Occurrence, *range)
            .with_predicate(predicate)
            .with_org(org.clone());
        Ok(self.aggregator.fetch(category, &query).await?.len() as u64)
    }

    /// Every scalar card that applies to `category`
    pub async fn scorecard(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
        remove_outliers: bool,
    ) -> Result<Scorecard> {
        let no_filter = FilterSpec::default();
        let (total_census, event_total, events_per_100mm, percent_without_event, outliers) = tokio::try_join!(
            self.total_census(org, range),
            self.event_total(category, org, range, remove_outliers),
            self.events_per_100mm(category, org, range, remove_outliers),
            self.percent_without_event(category, org, range),
            self.outlier_summary(category, org, range),
        )?;

        let mut card = Scorecard {
            category,
            range: *range,
            total_census,
            event_total,
            events_per_100mm,
            percent_without_event,
            outliers,
            alos: None,
            los_per_100mm: None,
            readmit: None,
            er_to_inpatient: None,
            severe_events: None,
        };

        if category.is_admission() {
            let (alos, los, readmit) = tokio::try_join!(
                self.alos(category, org, range, &no_filter),
                self.los_per_100mm(category, org, range, &no_filter),
                self.readmit_rate(category, org, range, READMIT_WINDOW_DAYS, &no_filter),
            )?;
            card.alos = Some(alos);
            card.los_per_100mm = Some(los);
            card.readmit = Some(readmit);
        }
        if category.is_er() {
            card.er_to_inpatient = Some(self.er_to_inpatient(org, range, &no_filter).await?);
        }
        if severe_predicate(category).is_some() {
            card.severe_events = Some(self.severe_event_count(category, org, range).await?);
        }
        Ok(card)
    }
}

fn require_admission(category: EventCategory, measure: &str) -> Result<()> {
    if category.is_admission() {
        Ok(())
    } else {
        Err(AnalyticsError::Validation(format!(
            "{measure} is only defined for admission categories, not '{category}'"
        )))
    }
}

fn stay_request(
    category: EventCategory,
    org: &OrgFilter,
    range: &DateRange,
    filter: &FilterSpec,
) -> AggregateRequest {
    AggregateRequest::new(category, *range, Granularity::Month)
        .with_date_field(DateField::Discharge)
        .with_org(org.clone())
        .with_filter(filter.clone())
}

fn any_of(column: &'static str, values: &[&str]) -> Predicate {
    Predicate::In(
        Column::known(column),
        values.iter().map(|v| Value::from(*v)).collect(),
    )
}

/// Predicate selecting the most severe incidents of `category`
fn severe_predicate(category: EventCategory) -> Option<Predicate> {
    match category {
        EventCategory::Falls | EventCategory::MedErrors => {
            Some(any_of(columns::SEVERITY, &["Major Harm", "Death"]))
        }
        EventCategory::Burns => Some(any_of(columns::BURN_DEGREE, &["Third", "Fourth"])),
        EventCategory::Wounds => Some(Predicate::equals(
            Column::known(columns::PRESSURE_ULCER),
            "Unstageable",
        )),
        _ => None,
    }
}
