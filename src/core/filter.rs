//! Filter compilation
//!
//! Turns a caller's (primary column, primary value, secondary value) choice
//! into a [`Predicate`] plus the extra columns the aggregator must select.
//! Secondary values resolve to their owning column through the closed
//! [`FilterTarget`] table; unknown values are rejected.

use super::query::{Column, Predicate};
use crate::domain::{AnalyticsError, AttributeName, Result, Value};
use serde::{Deserialize, Serialize};

/// Column a secondary filter value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterTarget {
    TimeOfDay,
    DayOfWeek,
    LivingSituation,
    EnrolledWithinSixMonths,
    SentByOnCall,
    AwareOfSymptoms,
    AwareOfVisit,
    Preventable,
    AdmitReason,
}

impl FilterTarget {
    /// Resolves a secondary filter token
    ///
    /// Returns `None` for tokens outside the lookup table.
    pub fn resolve(token: &str) -> Option<Self> {
        let target = match token {
            "11P-8A" | "8A-5P" | "5P-11P" | "Unknown" => FilterTarget::TimeOfDay,
            "Monday" | "Tuesday" | "Wednesday" | "Thursday" | "Friday" | "Saturday"
            | "Sunday" => FilterTarget::DayOfWeek,
            "Alone" | "Family" | "Staff" => FilterTarget::LivingSituation,
            "6_mo" | "6 months" => FilterTarget::EnrolledWithinSixMonths,
            "oc" => FilterTarget::SentByOnCall,
            "ss" => FilterTarget::AwareOfSymptoms,
            "visit" => FilterTarget::AwareOfVisit,
            "Preventable/Avoidable" => FilterTarget::Preventable,
            "Skilled" | "Custodial" | "Respite" => FilterTarget::AdmitReason,
            _ => return None,
        };
        Some(target)
    }

    /// Store column holding this attribute
    pub fn column(&self) -> &'static str {
        match self {
            FilterTarget::TimeOfDay => "time",
            FilterTarget::DayOfWeek => "dow",
            FilterTarget::LivingSituation => "living_situation",
            FilterTarget::EnrolledWithinSixMonths => "w_six_months",
            FilterTarget::SentByOnCall => "sent_by_oc",
            FilterTarget::AwareOfSymptoms => "aware_ss",
            FilterTarget::AwareOfVisit => "aware_visit",
            FilterTarget::Preventable => "preventable",
            FilterTarget::AdmitReason => "admit_reason",
        }
    }

    /// Binary flag columns store `1.0` / `0.0` and match the flag, not the token
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            FilterTarget::EnrolledWithinSixMonths
                | FilterTarget::SentByOnCall
                | FilterTarget::AwareOfSymptoms
                | FilterTarget::AwareOfVisit
                | FilterTarget::Preventable
        )
    }

    fn value_for(&self, token: &str) -> Value {
        if self.is_binary() {
            Value::Number(1.0)
        } else {
            Value::Text(token.to_string())
        }
    }
}

/// Columns whose values are `1.0` / `0.0` flags
const BINARY_COLUMNS: [&str; 5] = [
    "preventable",
    "w_six_months",
    "aware_ss",
    "aware_visit",
    "sent_by_oc",
];

/// Whether series keyed by `column` should be labelled Yes/No
pub fn is_binary_column(column: &AttributeName) -> bool {
    BINARY_COLUMNS.contains(&column.as_str())
}

/// Caller filter selection
///
/// # Examples
///
/// ```
/// use pacemetrics::core::filter::FilterSpec;
///
/// let spec = FilterSpec::by_column("facility")
///     .unwrap()
///     .with_value("Miriam")
///     .with_secondary("Monday");
/// let compiled = spec.compile().unwrap();
/// assert_eq!(compiled.extra_columns[0].as_str(), "dow");
///
/// assert!(FilterSpec::default().with_secondary("Blursday").compile().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub primary_column: Option<AttributeName>,
    pub primary_value: Option<String>,
    pub secondary_value: Option<String>,
}

/// Output of [`FilterSpec::compile`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub predicate: Predicate,
    /// Columns pulled in by the secondary filter
    pub extra_columns: Vec<AttributeName>,
}

impl FilterSpec {
    /// Breaks results out by `column`
    pub fn by_column(column: &str) -> Result<Self> {
        let column = AttributeName::new(column).map_err(AnalyticsError::Validation)?;
        Ok(Self {
            primary_column: Some(column),
            ..Self::default()
        })
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.primary_value = Some(value.into());
        self
    }

    pub fn with_secondary(mut self, value: impl Into<String>) -> Self {
        self.secondary_value = Some(value.into());
        self
    }

    /// Same primary column, no values: the unfiltered baseline used for
    /// category ordering
    pub fn baseline(&self) -> Self {
        Self {
            primary_column: self.primary_column.clone(),
            primary_value: None,
            secondary_value: None,
        }
    }

    /// Whether any equality predicate is applied
    pub fn is_filtering(&self) -> bool {
        self.primary_value.is_some() || self.secondary_value.is_some()
    }

    /// Compiles to a predicate
    ///
    /// # Errors
    ///
    /// - `InvalidFilter` if the secondary value is not in the lookup table
    /// - `Validation` if a primary value is given without a primary column
    pub fn compile(&self) -> Result<CompiledFilter> {
        let mut predicate = Predicate::Always;
        let mut extra_columns = Vec::new();

        if let Some(value) = &self.primary_value {
            let column = self.primary_column.clone().ok_or_else(|| {
                AnalyticsError::Validation(format!(
                    "Filter value '{value}' given without a filter column"
                ))
            })?;
            // Flags compare numerically; everything else matches the column's text form
            let bound = if is_binary_column(&column) {
                Value::from_token(value)
            } else {
                Value::Text(value.clone())
            };
            predicate = predicate.and(Predicate::Eq(Column::Attribute(column), bound));
        }

        if let Some(token) = &self.secondary_value {
            let target = FilterTarget::resolve(token)
                .ok_or_else(|| AnalyticsError::InvalidFilter(token.clone()))?;
            let column = Column::known(target.column());
            if let Column::Attribute(name) = &column {
                extra_columns.push(name.clone());
            }
            predicate = predicate.and(Predicate::Eq(column, target.value_for(token)));
        }

        tracing::debug!(
            primary_column = ?self.primary_column.as_ref().map(AttributeName::as_str),
            has_primary_value = self.primary_value.is_some(),
            secondary = ?self.secondary_value,
            "Compiled filter"
        );

        Ok(CompiledFilter {
            predicate,
            extra_columns,
        })
    }
}
