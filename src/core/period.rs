//! Period bucketing
//!
//! Normalizes caller date ranges to whole calendar months or quarters and
//! produces the canonical bucket sequence for a range.

use crate::domain::dates::{first_of_month, last_day_of_month};
use crate::domain::{DateRange, Granularity};
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;

/// Default day-of-month below which a trailing month is treated as partial
pub const DEFAULT_MONTH_END_CUTOFF_DAY: u32 = 22;

/// Canonical bucket label
///
/// Months render as `2023-01`, quarters as `2023Q2`. Ordering is
/// chronological within one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKey {
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
}

impl BucketKey {
    /// Key of the bucket containing `date`
    pub fn containing(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Month => BucketKey::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Quarter => BucketKey::Quarter {
                year: date.year(),
                quarter: quarter_of_month(date.month()),
            },
        }
    }

    /// First day of the bucket
    pub fn start(&self) -> NaiveDate {
        let (year, month) = match *self {
            BucketKey::Month { year, month } => (year, month),
            BucketKey::Quarter { year, quarter } => (year, (quarter - 1) * 3 + 1),
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the bucket
    pub fn end(&self) -> NaiveDate {
        match *self {
            BucketKey::Month { year, month } => last_day_of_month(year, month),
            BucketKey::Quarter { year, quarter } => last_day_of_month(year, quarter * 3),
        }
    }

    /// Key of the following bucket
    pub fn next(&self) -> Self {
        match *self {
            BucketKey::Month { year, month: 12 } => BucketKey::Month {
                year: year + 1,
                month: 1,
            },
            BucketKey::Month { year, month } => BucketKey::Month {
                year,
                month: month + 1,
            },
            BucketKey::Quarter { year, quarter: 4 } => BucketKey::Quarter {
                year: year + 1,
                quarter: 1,
            },
            BucketKey::Quarter { year, quarter } => BucketKey::Quarter {
                year,
                quarter: quarter + 1,
            },
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            BucketKey::Month { .. } => Granularity::Month,
            BucketKey::Quarter { .. } => Granularity::Quarter,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Month { year, month } => write!(f, "{year}-{month:02}"),
            BucketKey::Quarter { year, quarter } => write!(f, "{year}Q{quarter}"),
        }
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fixed month-to-quarter mapping: Jan-Mar is Q1, Apr-Jun Q2 and so on
fn quarter_of_month(month: u32) -> u32 {
    (month.clamp(1, 12) - 1) / 3 + 1
}

/// One calendar bucket with both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub key: BucketKey,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Bucket {
    pub fn from_key(key: BucketKey) -> Self {
        Self {
            key,
            start: key.start(),
            end: key.end(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// First day of every month in the bucket
    pub fn month_starts(&self) -> Vec<NaiveDate> {
        let mut months = Vec::new();
        let mut key = BucketKey::containing(self.start, Granularity::Month);
        while key.start() <= self.end {
            months.push(key.start());
            key = key.next();
        }
        months
    }
}

/// Normalizes date ranges and produces bucket sequences
///
/// # Examples
///
/// ```
/// use pacemetrics::core::period::PeriodBucketer;
/// use pacemetrics::domain::{DateRange, Granularity};
///
/// let bucketer = PeriodBucketer::default();
/// let range = DateRange::parse("01/15/2023", "04/10/2023").unwrap();
/// let buckets = bucketer.buckets(&range, Granularity::Month);
///
/// // April is partial (day 10 < 22) and is dropped
/// let keys: Vec<String> = buckets.iter().map(|b| b.key.to_string()).collect();
/// assert_eq!(keys, vec!["2023-01", "2023-02", "2023-03"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBucketer {
    month_end_cutoff_day: u32,
}

impl Default for PeriodBucketer {
    fn default() -> Self {
        Self {
            month_end_cutoff_day: DEFAULT_MONTH_END_CUTOFF_DAY,
        }
    }
}

impl PeriodBucketer {
    /// Creates a bucketer with a custom trailing-month cutoff day
    pub fn new(month_end_cutoff_day: u32) -> Self {
        Self {
            month_end_cutoff_day,
        }
    }

    pub fn month_end_cutoff_day(&self) -> u32 {
        self.month_end_cutoff_day
    }

    /// Expands or trims a caller range to whole periods
    ///
    /// Months: start moves to the 1st; end moves to the last day of its
    /// month, after first stepping back one month when the end day is below
    /// the cutoff. Quarters: start moves to the first day of its quarter;
    /// end moves back to the last quarter end on or before it.
    pub fn normalize(&self, range: &DateRange, granularity: Granularity) -> DateRange {
        match granularity {
            Granularity::Month => {
                let start = first_of_month(range.start);
                let mut end_month = BucketKey::containing(range.end, Granularity::Month);
                if range.end.day() < self.month_end_cutoff_day {
                    end_month = previous(end_month);
                }
                DateRange::new(start, end_month.end())
            }
            Granularity::Quarter => {
                let start = BucketKey::containing(range.start, Granularity::Quarter).start();
                let containing = BucketKey::containing(range.end, Granularity::Quarter);
                let end = if containing.end() == range.end {
                    range.end
                } else {
                    previous(containing).end()
                };
                DateRange::new(start, end)
            }
        }
    }

    /// Ordered buckets covering an already-normalized range
    ///
    /// Returns an empty sequence when `start > end`.
    pub fn bucket_sequence(&self, range: &DateRange, granularity: Granularity) -> Vec<Bucket> {
        let mut buckets = Vec::new();
        if range.is_empty() {
            return buckets;
        }
        let mut key = BucketKey::containing(range.start, granularity);
        while key.start() <= range.end {
            buckets.push(Bucket::from_key(key));
            key = key.next();
        }
        buckets
    }

    /// Normalizes `range` and returns its buckets
    pub fn buckets(&self, range: &DateRange, granularity: Granularity) -> Vec<Bucket> {
        self.bucket_sequence(&self.normalize(range, granularity), granularity)
    }
}

fn previous(key: BucketKey) -> BucketKey {
    match key {
        BucketKey::Month { year, month: 1 } => BucketKey::Month {
            year: year - 1,
            month: 12,
        },
        BucketKey::Month { year, month } => BucketKey::Month {
            year,
            month: month - 1,
        },
        BucketKey::Quarter { year, quarter: 1 } => BucketKey::Quarter {
            year: year - 1,
            quarter: 4,
        },
        BucketKey::Quarter { year, quarter } => BucketKey::Quarter {
            year,
            quarter: quarter - 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test_case(ymd(2023, 3, 21), ymd(2023, 2, 28) ; "day before cutoff rolls back")]
    #[test_case(ymd(2023, 3, 22), ymd(2023, 3, 31) ; "cutoff day keeps month")]
    #[test_case(ymd(2023, 1, 5), ymd(2022, 12, 31) ; "january rolls into previous year")]
    #[test_case(ymd(2024, 3, 1), ymd(2024, 2, 29) ; "leap february")]
    fn test_month_end_cutoff(end: NaiveDate, expected: NaiveDate) {
        let bucketer = PeriodBucketer::default();
        let range = bucketer.normalize(&DateRange::new(ymd(2022, 6, 17), end), Granularity::Month);
        assert_eq!(range.start, ymd(2022, 6, 1));
        assert_eq!(range.end, expected);
    }

    #[test]
    fn test_cutoff_is_configurable() {
        let bucketer = PeriodBucketer::new(1);
        let range = bucketer.normalize(
            &DateRange::new(ymd(2023, 1, 1), ymd(2023, 3, 1)),
            Granularity::Month,
        );
        assert_eq!(range.end, ymd(2023, 3, 31));
    }

    #[test_case(ymd(2023, 2, 14), ymd(2023, 11, 30), ymd(2023, 1, 1), ymd(2023, 9, 30) ; "partial trailing quarter")]
    #[test_case(ymd(2023, 4, 1), ymd(2023, 12, 31), ymd(2023, 4, 1), ymd(2023, 12, 31) ; "aligned range")]
    fn test_quarter_normalize(start: NaiveDate, end: NaiveDate, s2: NaiveDate, e2: NaiveDate) {
        let range = PeriodBucketer::default().normalize(&DateRange::new(start, end), Granularity::Quarter);
        assert_eq!(range, DateRange::new(s2, e2));
    }

    #[test]
    fn test_quarter_labels() {
        let range = DateRange::new(ymd(2022, 11, 1), ymd(2023, 6, 30));
        let keys: Vec<String> = PeriodBucketer::default()
            .buckets(&range, Granularity::Quarter)
            .iter()
            .map(|b| b.key.to_string())
            .collect();
        assert_eq!(keys, vec!["2022Q4", "2023Q1", "2023Q2"]);
    }

    #[test]
    fn test_empty_after_normalization() {
        // Ends before the cutoff in its first month
        let range = DateRange::new(ymd(2023, 5, 1), ymd(2023, 5, 10));
        let bucketer = PeriodBucketer::default();
        assert!(bucketer.normalize(&range, Granularity::Month).is_empty());
        assert!(bucketer.buckets(&range, Granularity::Month).is_empty());
    }

    #[test]
    fn test_buckets_partition_range() {
        let bucketer = PeriodBucketer::default();
        for granularity in [Granularity::Month, Granularity::Quarter] {
            let range = bucketer.normalize(
                &DateRange::new(ymd(2021, 2, 9), ymd(2023, 10, 25)),
                granularity,
            );
            let buckets = bucketer.bucket_sequence(&range, granularity);

            assert_eq!(buckets.first().unwrap().start, range.start);
            assert_eq!(buckets.last().unwrap().end, range.end);
            for pair in buckets.windows(2) {
                assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
            }
        }
    }

    #[test]
    fn test_bucket_counts() {
        let bucketer = PeriodBucketer::default();
        let range = DateRange::new(ymd(2023, 1, 1), ymd(2023, 12, 31));
        assert_eq!(bucketer.buckets(&range, Granularity::Month).len(), 12);
        assert_eq!(bucketer.buckets(&range, Granularity::Quarter).len(), 4);
    }

    #[test]
    fn test_quarter_month_starts() {
        let bucket = Bucket::from_key(BucketKey::Quarter {
            year: 2023,
            quarter: 2,
        });
        assert_eq!(
            bucket.month_starts(),
            vec![ymd(2023, 4, 1), ymd(2023, 5, 1), ymd(2023, 6, 1)]
        );
    }

    #[test]
    fn test_month_key_format() {
        let key = BucketKey::containing(ymd(2023, 1, 31), Granularity::Month);
        assert_eq!(key.to_string(), "2023-01");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2023-01\"");
    }
}
