//! Rate normalization
//!
//! Turns counts into per-100-member-month rates and percentages. A zero
//! denominator never raises and never becomes `0`: it yields
//! [`RateValue::NotAvailable`], serialized as `"N/A"`.

use crate::core::aggregate::{CountMatrix, Matrix};
use crate::core::census::DenominatorSeries;
use serde::{Serialize, Serializer};
use std::fmt;

/// A computed rate, or the sentinel for an undefined denominator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RateValue {
    Value(f64),
    #[default]
    NotAvailable,
}

impl RateValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            RateValue::Value(v) => Some(*v),
            RateValue::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RateValue::Value(_))
    }
}

impl fmt::Display for RateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateValue::Value(v) => write!(f, "{v}"),
            RateValue::NotAvailable => write!(f, "N/A"),
        }
    }
}

impl Serialize for RateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RateValue::Value(v) => serializer.serialize_f64(*v),
            RateValue::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

/// Rounds half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `numerator / denominator`, or `NotAvailable` when the denominator is zero
///
/// # Examples
///
/// ```
/// use pacemetrics::core::rates::{divide_safely, RateValue};
///
/// assert_eq!(divide_safely(3.0, 4.0), RateValue::Value(0.75));
/// assert_eq!(divide_safely(3.0, 0.0), RateValue::NotAvailable);
/// ```
pub fn divide_safely(numerator: f64, denominator: f64) -> RateValue {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        RateValue::NotAvailable
    } else {
        RateValue::Value(numerator / denominator)
    }
}

/// Result of the 30-day readmission measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadmitRate {
    /// Readmissions as a percent of admissions
    pub rate_percent: RateValue,
    /// Admissions within the window of the previous one
    pub readmissions: u64,
    /// All qualifying admissions in the period
    pub admissions: u64,
}

/// Rounding and scaling of rates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateNormalizer {
    decimals: u32,
}

impl Default for RateNormalizer {
    fn default() -> Self {
        Self { decimals: 2 }
    }
}

impl RateNormalizer {
    pub fn new(decimals: u32) -> Self {
        Self { decimals }
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    fn scaled(&self, numerator: f64, denominator: f64) -> RateValue {
        match divide_safely(numerator, denominator) {
            RateValue::Value(v) => RateValue::Value(round_to(v * 100.0, self.decimals)),
            RateValue::NotAvailable => RateValue::NotAvailable,
        }
    }

    /// Events per 100 member-months
    pub fn per_100(&self, count: f64, census: u64) -> RateValue {
        self.scaled(count, census as f64)
    }

    /// `part` as a percent of `whole`
    pub fn percent(&self, part: f64, whole: f64) -> RateValue {
        self.scaled(part, whole)
    }

    /// Rounds a plain value, such as a mean length of stay
    pub fn round(&self, value: f64) -> f64 {
        round_to(value, self.decimals)
    }

    /// Divides every cell by its bucket's census, times 100
    ///
    /// Buckets missing from `denominator` or with a zero census are `N/A`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pacemetrics::core::aggregate::{Matrix, Series};
    /// use pacemetrics::core::census::{count_series, CensusPolicy};
    /// use pacemetrics::core::period::PeriodBucketer;
    /// use pacemetrics::core::rates::{RateNormalizer, RateValue};
    /// use pacemetrics::domain::{DateRange, EnrollmentInterval, Granularity};
    /// use chrono::NaiveDate;
    ///
    /// let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
    /// let buckets = PeriodBucketer::default()
    ///     .buckets(&DateRange::new(d(1, 1), d(2, 28)), Granularity::Month);
    /// let roster = vec![EnrollmentInterval::new("1", None, d(2, 1), None).unwrap()];
    /// let census = count_series(&roster, &buckets, CensusPolicy::default());
    ///
    /// let counts = Matrix::from_series(
    ///     buckets.iter().map(|b| b.key).collect(),
    ///     vec![Series::new("Total", vec![0, 2])],
    /// );
    /// let rates = RateNormalizer::default().normalize(&counts, &census);
    /// assert_eq!(rates.series[0].values, vec![RateValue::NotAvailable, RateValue::Value(200.0)]);
    /// ```
    pub fn normalize(&self, counts: &CountMatrix, denominator: &DenominatorSeries) -> Matrix<RateValue> {
        counts.map(|bucket, count| match denominator.get(bucket) {
            Some(census) => self.per_100(*count as f64, census),
            None => RateValue::NotAvailable,
        })
    }

    /// Each cell as a percent of its bucket in `totals`
    ///
    /// `totals` is aligned with `counts.buckets`; a zero total is `N/A`.
    pub fn percent_of_total(&self, counts: &CountMatrix, totals: &[u64]) -> Matrix<RateValue> {
        counts.map(|bucket, count| {
            let total = counts
                .buckets
                .iter()
                .position(|b| b == bucket)
                .and_then(|i| totals.get(i))
                .copied()
                .unwrap_or(0);
            self.percent(*count as f64, total as f64)
        })
    }

    /// 30-day readmission rate: readmissions over admissions, not census
    ///
    /// No admissions yields `N/A` rather than `0%`.
    pub fn readmit_rate(&self, readmissions: u64, admissions: u64) -> ReadmitRate {
        ReadmitRate {
            rate_percent: self.percent(readmissions as f64, admissions as f64),
            readmissions,
            admissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(12.346, 2, 12.35 ; "rounds up")]
    #[test_case(1.0 / 3.0, 2, 0.33 ; "truncates repeating")]
    #[test_case(2.5, 0, 3.0 ; "zero decimals")]
    fn test_round_to(value: f64, decimals: u32, expected: f64) {
        assert!((round_to(value, decimals) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_per_100_recovers_count() {
        let normalizer = RateNormalizer::new(6);
        let census = 37;
        for count in [0_u64, 1, 5, 36, 120] {
            let rate = normalizer.per_100(count as f64, census).value().unwrap();
            let recovered = rate * census as f64 / 100.0;
            assert!((recovered - count as f64).abs() < 1e-3);
        }
    }

    #[test]
    fn test_zero_census_is_not_available() {
        assert_eq!(RateNormalizer::default().per_100(4.0, 0), RateValue::NotAvailable);
        assert_eq!(RateNormalizer::default().per_100(0.0, 10), RateValue::Value(0.0));
    }

    #[test]
    fn test_readmit_rate() {
        let rate = RateNormalizer::default().readmit_rate(3, 10);
        assert_eq!(rate.rate_percent, RateValue::Value(30.0));

        let none = RateNormalizer::default().readmit_rate(0, 0);
        assert_eq!(none.rate_percent, RateValue::NotAvailable);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&vec![RateValue::Value(1.5), RateValue::NotAvailable]).unwrap();
        assert_eq!(json, r#"[1.5,"N/A"]"#);
        assert_eq!(RateValue::NotAvailable.to_string(), "N/A");
    }
}
