//! Event categories, tables and records
//!
//! Every metric reads one of a fixed set of event tables. The mapping from a
//! caller-facing [`EventCategory`] to the tables it reads is closed: adding a
//! category means adding a variant and handling it in every `match`.

use super::ids::{OrgUnit, ParticipantId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Well-known column names shared by the event tables
pub mod columns {
    /// Participant key present on every table
    pub const PARTICIPANT_ID: &str = "member_id";
    /// Organizational unit column on the enrollment table
    pub const CENTER: &str = "center";
    pub const ADMISSION_DATE: &str = "admission_date";
    pub const DISCHARGE_DATE: &str = "discharge_date";
    /// Length of stay in days
    pub const LOS: &str = "los";
    pub const DAYS_SINCE_LAST_ADMISSION: &str = "days_since_last_admission";
    /// 1 when an inpatient admission came through the ER
    pub const ER: &str = "er";
    pub const ADMISSION_TYPE: &str = "admission_type";
    pub const ADMIT_REASON: &str = "admit_reason";
    pub const SEVERITY: &str = "severity";
    pub const BURN_DEGREE: &str = "burn_degree";
    pub const PRESSURE_ULCER: &str = "pressure_ulcer";
}

/// Physical event table in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTable {
    Inpatient,
    ErOnly,
    InpatientSnf,
    Falls,
    MedErrors,
    Burns,
    Infections,
    Wounds,
    Grievances,
}

impl EventTable {
    /// Table name as stored
    pub fn name(&self) -> &'static str {
        match self {
            EventTable::Inpatient => "inpatient",
            EventTable::ErOnly => "er_only",
            EventTable::InpatientSnf => "inpatient_snf",
            EventTable::Falls => "falls",
            EventTable::MedErrors => "med_errors",
            EventTable::Burns => "burns",
            EventTable::Infections => "infections",
            EventTable::Wounds => "wounds",
            EventTable::Grievances => "grievances",
        }
    }

    /// Column holding the given date for this table
    ///
    /// Incident and grievance tables have a single event date, which also
    /// answers admission/discharge lookups.
    pub fn date_column(&self, field: DateField) -> &'static str {
        match self {
            EventTable::Inpatient | EventTable::ErOnly | EventTable::InpatientSnf => match field {
                DateField::Occurrence | DateField::Admission => columns::ADMISSION_DATE,
                DateField::Discharge => columns::DISCHARGE_DATE,
            },
            EventTable::Falls
            | EventTable::MedErrors
            | EventTable::Burns
            | EventTable::Infections
            | EventTable::Wounds => "date_time_occurred",
            EventTable::Grievances => "date_grievance_received",
        }
    }
}

impl fmt::Display for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which date of an event is used for range filtering and bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    Occurrence,
    Admission,
    Discharge,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::Occurrence => "occurrence",
            DateField::Admission => "admission",
            DateField::Discharge => "discharge",
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "occurrence" | "occurred" | "date_time_occurred" => Ok(DateField::Occurrence),
            "admission" | "admission_date" => Ok(DateField::Admission),
            "discharge" | "discharge_date" => Ok(DateField::Discharge),
            other => Err(format!(
                "Unknown date field '{other}'. Expected occurrence, admission or discharge"
            )),
        }
    }
}

/// Caller-facing event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Acute hospital admissions
    Inpatient,
    /// Psychiatric unit admissions, stored in the inpatient table
    InpatientPsych,
    /// ER visits: stand-alone ER visits plus inpatient admissions through the ER
    Er,
    /// Stand-alone ER visits
    ErOnly,
    /// Skilled nursing facility stays
    InpatientSnf,
    Falls,
    MedErrors,
    Burns,
    Infections,
    Wounds,
    Grievances,
}

impl EventCategory {
    /// Every category, in display order
    pub const ALL: [EventCategory; 11] = [
        EventCategory::Inpatient,
        EventCategory::InpatientPsych,
        EventCategory::Er,
        EventCategory::ErOnly,
        EventCategory::InpatientSnf,
        EventCategory::Falls,
        EventCategory::MedErrors,
        EventCategory::Burns,
        EventCategory::Infections,
        EventCategory::Wounds,
        EventCategory::Grievances,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Inpatient => "inpatient",
            EventCategory::InpatientPsych => "inpatient_psych",
            EventCategory::Er => "er",
            EventCategory::ErOnly => "er_only",
            EventCategory::InpatientSnf => "inpatient_snf",
            EventCategory::Falls => "falls",
            EventCategory::MedErrors => "med_errors",
            EventCategory::Burns => "burns",
            EventCategory::Infections => "infections",
            EventCategory::Wounds => "wounds",
            EventCategory::Grievances => "grievances",
        }
    }

    /// Admission-like categories carry admission/discharge dates, LOS and
    /// readmission data
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            EventCategory::Inpatient
                | EventCategory::InpatientPsych
                | EventCategory::Er
                | EventCategory::ErOnly
                | EventCategory::InpatientSnf
        )
    }

    /// ER categories count visits by admission date regardless of the
    /// requested field
    pub fn is_er(&self) -> bool {
        matches!(self, EventCategory::Er | EventCategory::ErOnly)
    }

    /// Date field used when the caller does not choose one
    pub fn default_date_field(&self) -> DateField {
        if self.is_admission() {
            DateField::Admission
        } else {
            DateField::Occurrence
        }
    }

    /// Date field actually used for visit counts
    pub fn visit_date_field(&self, requested: DateField) -> DateField {
        if self.is_er() {
            DateField::Admission
        } else if self.is_admission() {
            requested
        } else {
            DateField::Occurrence
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        EventCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = EventCategory::ALL.iter().map(|c| c.as_str()).collect();
                format!(
                    "Unknown event category '{s}'. Expected one of: {}",
                    known.join(", ")
                )
            })
    }
}

/// A single attribute value read from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// Interprets a caller-supplied filter token
    ///
    /// Integers and decimals become numeric values so they compare against
    /// numeric columns; anything else stays text.
    pub fn from_token(token: &str) -> Self {
        let trimmed = token.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(token.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, parsing text when possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null | Value::Date(_) => None,
        }
    }

    /// Store-style equality: numbers compare numerically across
    /// integer/decimal/text encodings, NULL equals nothing
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Date(d), Value::Text(s)) | (Value::Text(s), Value::Date(d)) => {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok_and(|p| p == *d)
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Ordering used by range predicates; `None` when the values are not
    /// comparable
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Series label for this value
    ///
    /// Binary flag columns render `1.0` / `0.0` as `Yes` / `No`.
    pub fn label(&self, binary_flag: bool) -> String {
        if binary_flag {
            match self.as_f64() {
                Some(n) if n == 1.0 => return "Yes".to_string(),
                Some(n) if n == 0.0 => return "No".to_string(),
                _ => {}
            }
        }
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.1}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// One row from an event table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub organizational_unit: Option<OrgUnit>,
    pub table: EventTable,
    #[serde(default)]
    pub occurrence_date: Option<NaiveDate>,
    #[serde(default)]
    pub admission_date: Option<NaiveDate>,
    #[serde(default)]
    pub discharge_date: Option<NaiveDate>,
    /// Categorical and numeric columns keyed by column name
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl EventRecord {
    /// Creates a record with no dates or attributes set
    pub fn new(participant_id: ParticipantId, table: EventTable) -> Self {
        Self {
            participant_id,
            organizational_unit: None,
            table,
            occurrence_date: None,
            admission_date: None,
            discharge_date: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the date for `field`
    pub fn with_date(mut self, field: DateField, date: NaiveDate) -> Self {
        match field {
            DateField::Occurrence => self.occurrence_date = Some(date),
            DateField::Admission => self.admission_date = Some(date),
            DateField::Discharge => self.discharge_date = Some(date),
        }
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_unit(mut self, unit: OrgUnit) -> Self {
        self.organizational_unit = Some(unit);
        self
    }

    /// Date used for `field`, following the table's column mapping
    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match self.table.date_column(field) {
            columns::ADMISSION_DATE => self.admission_date.or(self.occurrence_date),
            columns::DISCHARGE_DATE => self.discharge_date,
            _ => self
                .occurrence_date
                .or(self.admission_date)
                .or(self.discharge_date),
        }
    }

    /// Attribute value, `Value::Null` when the column is absent
    pub fn attribute(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attributes.get(name).unwrap_or(&NULL)
    }
}
