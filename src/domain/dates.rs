//! Calendar date helpers
//!
//! Caller dates arrive as human strings and are parsed here, before any
//! engine component sees them. Parsing failures are caller errors and are
//! reported immediately.

use super::errors::AnalyticsError;
use super::result::Result;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parses a caller-supplied date
///
/// Accepts `MM/DD/YYYY` (the dashboard format) and ISO `YYYY-MM-DD`.
///
/// # Examples
///
/// ```
/// use pacemetrics::domain::dates::parse_human_date;
/// use chrono::NaiveDate;
///
/// let date = parse_human_date("03/31/2023").unwrap();
/// assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 31).unwrap());
/// assert_eq!(parse_human_date("2023-03-31").unwrap(), date);
/// assert!(parse_human_date("31/03/2023").is_err());
/// ```
pub fn parse_human_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let format = if trimmed.contains('/') {
        "%m/%d/%Y"
    } else {
        "%Y-%m-%d"
    };

    NaiveDate::parse_from_str(trimmed, format).map_err(|e| AnalyticsError::DateParse {
        input: input.to_string(),
        reason: format!("{e} (expected MM/DD/YYYY or YYYY-MM-DD)"),
    })
}

/// Last calendar day of the given month
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// First calendar day of the month containing `date`
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Inclusive calendar date range
///
/// `start > end` is allowed and represents an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included
    pub start: NaiveDate,
    /// Last day included
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new range
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parses a range from two human date strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(parse_human_date(start)?, parse_human_date(end)?))
    }

    /// Whether the range contains no days
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Whether `date` falls inside the range (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Bucket granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Quarter,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "month" | "m" => Ok(Granularity::Month),
            "quarter" | "q" => Ok(Granularity::Quarter),
            other => Err(AnalyticsError::Validation(format!(
                "Unknown granularity '{other}'. Expected month or quarter"
            ))),
        }
    }
}
