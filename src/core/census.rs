//! Census (member-month) denominators
//!
//! Counts enrolled participants per bucket from enrollment intervals. The
//! counting itself is a pure function ([`count_series`]); [`CensusCalculator`]
//! adds the store read and date normalization.

use crate::adapters::store::EventStore;
use crate::core::period::{Bucket, BucketKey, PeriodBucketer};
use crate::domain::{DateRange, EnrollmentInterval, Granularity, OrgFilter, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Reference day used for a monthly census
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthReference {
    /// Enrolled on the 1st of the month
    #[default]
    FirstOfMonth,
    /// Enrolled on the last day of the month
    EndOfMonth,
}

/// How a quarter's census is formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarterCensus {
    /// One count: enrolled on any day of the quarter
    #[default]
    AnyDay,
    /// Sum of the three monthly censuses, approximating member-months
    SumOfMonths,
}

/// Census counting policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CensusPolicy {
    pub month_reference: MonthReference,
    pub quarter: QuarterCensus,
}

impl CensusPolicy {
    pub fn new(as_of_first: bool, quarter_is_sum_of_months: bool) -> Self {
        Self {
            month_reference: if as_of_first {
                MonthReference::FirstOfMonth
            } else {
                MonthReference::EndOfMonth
            },
            quarter: if quarter_is_sum_of_months {
                QuarterCensus::SumOfMonths
            } else {
                QuarterCensus::AnyDay
            },
        }
    }

    /// Policy for per-100-member-month denominators
    pub fn member_months(as_of_first: bool) -> Self {
        Self::new(as_of_first, true)
    }
}

/// One bucket's census
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CensusPoint {
    pub bucket: BucketKey,
    pub census: u64,
}

/// Census per bucket, in bucket order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DenominatorSeries {
    points: Vec<CensusPoint>,
}

impl DenominatorSeries {
    pub fn get(&self, bucket: &BucketKey) -> Option<u64> {
        self.points
            .iter()
            .find(|p| p.bucket == *bucket)
            .map(|p| p.census)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CensusPoint> {
        self.points.iter()
    }

    pub fn keys(&self) -> Vec<BucketKey> {
        self.points.iter().map(|p| p.bucket).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum over every bucket
    pub fn total(&self) -> u64 {
        self.points.iter().map(|p| p.census).sum()
    }
}

fn enrolled_on(intervals: &[EnrollmentInterval], date: NaiveDate) -> u64 {
    intervals.iter().filter(|i| i.is_enrolled_on(date)).count() as u64
}

fn enrolled_during(intervals: &[EnrollmentInterval], start: NaiveDate, end: NaiveDate) -> u64 {
    intervals.iter().filter(|i| i.overlaps(start, end)).count() as u64
}

fn month_census(intervals: &[EnrollmentInterval], month_start: NaiveDate, policy: CensusPolicy) -> u64 {
    let reference = match policy.month_reference {
        MonthReference::FirstOfMonth => month_start,
        MonthReference::EndOfMonth => {
            BucketKey::containing(month_start, Granularity::Month).end()
        }
    };
    enrolled_on(intervals, reference)
}

/// Census for each bucket
///
/// # Examples
///
/// ```
/// use pacemetrics::core::census::{count_series, CensusPolicy};
/// use pacemetrics::core::period::PeriodBucketer;
/// use pacemetrics::domain::{DateRange, EnrollmentInterval, Granularity};
/// use chrono::NaiveDate;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
/// let roster = vec![
///     EnrollmentInterval::new("1", None, d(1, 1), None).unwrap(),
///     EnrollmentInterval::new("2", None, d(2, 15), None).unwrap(),
/// ];
/// let buckets = PeriodBucketer::default()
///     .buckets(&DateRange::new(d(1, 1), d(3, 31)), Granularity::Month);
///
/// let series = count_series(&roster, &buckets, CensusPolicy::default());
/// let counts: Vec<u64> = series.iter().map(|p| p.census).collect();
/// assert_eq!(counts, vec![1, 1, 2]);
/// ```
pub fn count_series(
    intervals: &[EnrollmentInterval],
    buckets: &[Bucket],
    policy: CensusPolicy,
) -> DenominatorSeries {
    let points = buckets
        .iter()
        .map(|bucket| {
            let census = match (bucket.key.granularity(), policy.quarter) {
                (Granularity::Month, _) => month_census(intervals, bucket.start, policy),
                (Granularity::Quarter, QuarterCensus::AnyDay) => {
                    enrolled_during(intervals, bucket.start, bucket.end)
                }
                (Granularity::Quarter, QuarterCensus::SumOfMonths) => bucket
                    .month_starts()
                    .into_iter()
                    .map(|m| month_census(intervals, m, policy))
                    .sum(),
            };
            CensusPoint {
                bucket: bucket.key,
                census,
            }
        })
        .collect();

    DenominatorSeries { points }
}

/// Participants enrolled on any day of `range`
pub fn count_enrolled_during(intervals: &[EnrollmentInterval], range: &DateRange) -> u64 {
    enrolled_during(intervals, range.start, range.end)
}

/// Reads enrollment and computes census denominators
#[derive(Clone)]
pub struct CensusCalculator {
    store: Arc<dyn EventStore + Send + Sync>,
    bucketer: PeriodBucketer,
}

impl CensusCalculator {
    pub fn new(store: Arc<dyn EventStore + Send + Sync>, bucketer: PeriodBucketer) -> Self {
        Self { store, bucketer }
    }

    /// Census per bucket over the normalized `range`
    ///
    /// # Errors
    ///
    /// Returns a store error if enrollment cannot be read
    pub async fn census_series(
        &self,
        org: &OrgFilter,
        range: &DateRange,
        granularity: Granularity,
        policy: CensusPolicy,
    ) -> Result<DenominatorSeries> {
        let buckets = self.bucketer.buckets(range, granularity);
        if buckets.is_empty() {
            return Ok(DenominatorSeries::default());
        }

        let intervals = self.store.fetch_enrollment(org).await?;
        let series = count_series(&intervals, &buckets, policy);

        tracing::debug!(
            org = %org,
            granularity = %granularity,
            buckets = series.len(),
            enrollment_rows = intervals.len(),
            "Computed census series"
        );
        Ok(series)
    }

    /// Sum of monthly censuses over `range`, the member-month denominator
    /// used by scalar per-100 rates
    pub async fn member_months(
        &self,
        org: &OrgFilter,
        range: &DateRange,
        policy: CensusPolicy,
    ) -> Result<u64> {
        Ok(self
            .census_series(org, range, Granularity::Month, policy)
            .await?
            .total())
    }

    /// Participants enrolled on any day of `range`, however briefly
    pub async fn total_census(&self, org: &OrgFilter, range: &DateRange) -> Result<u64> {
        let intervals = self.store.fetch_enrollment(org).await?;
        Ok(count_enrolled_during(&intervals, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn interval(id: &str, start: NaiveDate, end: Option<NaiveDate>) -> EnrollmentInterval {
        EnrollmentInterval::new(id, None, start, end).unwrap()
    }

    fn roster_of(n: usize) -> Vec<EnrollmentInterval> {
        (0..n)
            .map(|i| interval(&format!("p{i}"), d(2023, 1, 1), Some(d(2023, 12, 31))))
            .collect()
    }

    #[test]
    fn test_full_year_roster_counts_everyone() {
        let buckets = PeriodBucketer::default()
            .buckets(&DateRange::new(d(2023, 1, 1), d(2023, 3, 31)), Granularity::Month);
        let series = count_series(&roster_of(10), &buckets, CensusPolicy::new(true, false));

        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|p| p.census == 10));
        assert_eq!(series.keys()[0].to_string(), "2023-01");
    }

    #[test_case(true, 1 ; "first of month excludes mid month leaver")]
    #[test_case(false, 0 ; "end of month excludes mid month leaver")]
    fn test_month_reference(as_of_first: bool, expected: u64) {
        let roster = vec![interval("1", d(2022, 6, 1), Some(d(2023, 2, 14)))];
        let buckets = PeriodBucketer::default()
            .bucket_sequence(&DateRange::new(d(2023, 2, 1), d(2023, 2, 28)), Granularity::Month);
        let series = count_series(&roster, &buckets, CensusPolicy::new(as_of_first, false));
        assert_eq!(series.total(), expected);
    }

    #[test]
    fn test_disenrolled_on_reference_day_still_counts() {
        let roster = vec![interval("1", d(2022, 6, 1), Some(d(2023, 3, 1)))];
        let buckets = PeriodBucketer::default()
            .bucket_sequence(&DateRange::new(d(2023, 3, 1), d(2023, 3, 31)), Granularity::Month);
        assert_eq!(count_series(&roster, &buckets, CensusPolicy::default()).total(), 1);
    }

    #[test]
    fn test_quarter_policies() {
        // Joins mid February, so misses the January snapshot
        let roster = vec![
            interval("1", d(2022, 1, 1), None),
            interval("2", d(2023, 2, 15), None),
        ];
        let buckets = PeriodBucketer::default()
            .buckets(&DateRange::new(d(2023, 1, 1), d(2023, 3, 31)), Granularity::Quarter);
        assert_eq!(buckets.len(), 1);

        let any_day = count_series(&roster, &buckets, CensusPolicy::new(true, false));
        assert_eq!(any_day.total(), 2);

        let summed = count_series(&roster, &buckets, CensusPolicy::member_months(true));
        assert_eq!(summed.total(), 1 + 1 + 2);
    }

    #[test]
    fn test_series_is_non_negative_and_empty_for_empty_range() {
        let series = count_series(&[], &[], CensusPolicy::default());
        assert!(series.is_empty());
        assert_eq!(series.get(&BucketKey::Month { year: 2023, month: 1 }), None);
    }

    #[test]
    fn test_enrolled_during_counts_short_stays() {
        let roster = vec![
            interval("1", d(2023, 2, 3), Some(d(2023, 2, 4))),
            interval("2", d(2023, 5, 1), None),
            interval("3", d(2021, 1, 1), Some(d(2022, 12, 31))),
        ];
        let range = DateRange::new(d(2023, 1, 1), d(2023, 3, 31));
        assert_eq!(count_enrolled_during(&roster, &range), 1);
    }
}
