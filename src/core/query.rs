//! Typed query model
//!
//! Every store read is described by an [`EventQuery`]: a [`Source`] (one
//! table, a filtered table, or a union of branches), the date field and
//! inclusive range, an equality/range [`Predicate`] tree, the organizational
//! filter and the attribute columns to project. Backends render this tree
//! into their own query language; the in-memory store evaluates it directly.

use crate::domain::{
    columns, AttributeName, DateField, DateRange, EventCategory, EventRecord, EventTable,
    OrgFilter, Value,
};
use std::cmp::Ordering;

/// Column referenced by a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    ParticipantId,
    OrgUnit,
    Date(DateField),
    Attribute(AttributeName),
}

impl Column {
    /// Shorthand for a well-known attribute column
    ///
    /// Only used with the constant names in [`columns`], which are valid
    /// identifiers.
    pub(crate) fn known(name: &'static str) -> Self {
        Column::Attribute(AttributeName::new(name).unwrap_or_else(|e| unreachable!("{e}")))
    }

    fn value_of(&self, record: &EventRecord) -> Value {
        match self {
            Column::ParticipantId => Value::Text(record.participant_id.as_str().to_string()),
            Column::OrgUnit => record
                .organizational_unit
                .as_ref()
                .map(|u| Value::Text(u.as_str().to_string()))
                .unwrap_or(Value::Null),
            Column::Date(field) => record.date(*field).map(Value::Date).unwrap_or(Value::Null),
            Column::Attribute(name) => record.attribute(name.as_str()).clone(),
        }
    }
}

/// Comparison operator for [`Predicate::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Ne => "<>",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Ne => ordering != Ordering::Equal,
        }
    }
}

/// Row predicate
///
/// Comparisons involving NULL are false, as in SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    Eq(Column, Value),
    Compare(Column, CompareOp, Value),
    /// Inclusive on both ends
    Between(Column, Value, Value),
    /// Column equals any of the values
    In(Column, Vec<Value>),
    IsNull(Column),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(column: Column, value: impl Into<Value>) -> Self {
        Predicate::Eq(column, value.into())
    }

    /// Conjunction, flattening nested `And`s and dropping `Always`
    pub fn and(self, other: Predicate) -> Predicate {
        let mut parts = Vec::new();
        for p in [self, other] {
            match p {
                Predicate::Always => {}
                Predicate::And(inner) => parts.extend(inner),
                p => parts.push(p),
            }
        }
        match parts.len() {
            0 => Predicate::Always,
            1 => parts.pop().unwrap_or(Predicate::Always),
            _ => Predicate::And(parts),
        }
    }

    pub fn is_always(&self) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::And(parts) => parts.iter().all(Predicate::is_always),
            _ => false,
        }
    }

    /// Evaluates the predicate against one record
    pub fn matches(&self, record: &EventRecord) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Eq(column, value) => column.value_of(record).loosely_equals(value),
            Predicate::Compare(column, op, value) => column
                .value_of(record)
                .compare(value)
                .is_some_and(|ordering| op.holds(ordering)),
            Predicate::Between(column, low, high) => {
                let actual = column.value_of(record);
                matches!(
                    actual.compare(low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(actual.compare(high), Some(Ordering::Less | Ordering::Equal))
            }
            Predicate::In(column, values) => {
                let actual = column.value_of(record);
                values.iter().any(|v| actual.loosely_equals(v))
            }
            Predicate::IsNull(column) => column.value_of(record).is_null(),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }

    /// Parameters in render order
    pub fn bound_params(&self, out: &mut Vec<Value>) {
        match self {
            Predicate::Always | Predicate::IsNull(_) => {}
            Predicate::Eq(_, value) | Predicate::Compare(_, _, value) => out.push(value.clone()),
            Predicate::Between(_, low, high) => {
                out.push(low.clone());
                out.push(high.clone());
            }
            Predicate::In(_, values) => out.extend(values.iter().cloned()),
            Predicate::And(parts) => parts.iter().for_each(|p| p.bound_params(out)),
        }
    }

    /// Attribute columns referenced anywhere in the tree
    pub fn attribute_columns(&self) -> Vec<AttributeName> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes(&self, out: &mut Vec<AttributeName>) {
        match self {
            Predicate::Always => {}
            Predicate::Eq(c, _)
            | Predicate::Compare(c, _, _)
            | Predicate::Between(c, _, _)
            | Predicate::In(c, _)
            | Predicate::IsNull(c) => {
                if let Column::Attribute(name) = c {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
            }
            Predicate::And(parts) => parts.iter().for_each(|p| p.collect_attributes(out)),
        }
    }
}

/// Where rows come from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table(EventTable),
    /// A table restricted by a branch-local predicate
    Filtered(EventTable, Predicate),
    /// Concatenation of branches, duplicates kept
    UnionAll(Vec<Source>),
}

impl Source {
    /// Whether a record read from `record.table` belongs to this branch
    pub fn admits(&self, record: &EventRecord) -> bool {
        match self {
            Source::Table(table) => record.table == *table,
            Source::Filtered(table, predicate) => {
                record.table == *table && predicate.matches(record)
            }
            Source::UnionAll(branches) => branches.iter().any(|b| b.admits(record)),
        }
    }

    /// Leaf branches in render order
    pub fn branches(&self) -> Vec<(EventTable, &Predicate)> {
        static ALWAYS: Predicate = Predicate::Always;
        match self {
            Source::Table(table) => vec![(*table, &ALWAYS)],
            Source::Filtered(table, predicate) => vec![(*table, predicate)],
            Source::UnionAll(branches) => branches.iter().flat_map(Source::branches).collect(),
        }
    }

    pub fn bound_params(&self, out: &mut Vec<Value>) {
        for (_, predicate) in self.branches() {
            predicate.bound_params(out);
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Source::UnionAll(_))
    }
}

/// A complete store read
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub source: Source,
    pub date_field: DateField,
    pub range: DateRange,
    pub predicate: Predicate,
    pub org: OrgFilter,
    /// Attribute columns to return in addition to participant and date
    pub columns: Vec<AttributeName>,
}

impl EventQuery {
    pub fn new(source: Source, date_field: DateField, range: DateRange) -> Self {
        Self {
            source,
            date_field,
            range,
            predicate: Predicate::Always,
            org: OrgFilter::All,
            columns: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = self.predicate.and(predicate);
        self
    }

    pub fn with_org(mut self, org: OrgFilter) -> Self {
        self.org = org;
        self
    }

    /// Adds projected columns, skipping duplicates
    pub fn with_columns<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = AttributeName>,
    {
        for name in names {
            if !self.columns.contains(&name) {
                self.columns.push(name);
            }
        }
        self
    }

    /// Projected columns plus any column the outer predicate needs
    pub fn selected_columns(&self) -> Vec<AttributeName> {
        let mut selected = self.columns.clone();
        for name in self.predicate.attribute_columns() {
            if !selected.contains(&name) {
                selected.push(name);
            }
        }
        selected
    }

    /// Parameters in the order a renderer emits placeholders: branch
    /// predicates, date range, outer predicate, organizational unit
    pub fn bound_params(&self) -> Vec<Value> {
        let mut params = Vec::new();
        self.source.bound_params(&mut params);
        params.push(Value::Date(self.range.start));
        params.push(Value::Date(self.range.end));
        self.predicate.bound_params(&mut params);
        if let Some(unit) = self.org.unit() {
            params.push(Value::Text(unit.as_str().to_string()));
        }
        params
    }

    /// Whether `record` satisfies the whole query
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.source.admits(record)
            && record
                .date(self.date_field)
                .is_some_and(|d| self.range.contains(d))
            && self.predicate.matches(record)
            && self.org.admits(record.organizational_unit.as_ref())
    }
}

impl EventCategory {
    /// Source for counting events of this category
    ///
    /// `Er` is the union of stand-alone ER visits and inpatient admissions
    /// flagged `er = 1`.
    pub fn visit_source(&self) -> Source {
        match self {
            EventCategory::Inpatient => Source::Filtered(
                EventTable::Inpatient,
                Predicate::equals(Column::known(columns::ADMISSION_TYPE), "Acute Hospital"),
            ),
            EventCategory::InpatientPsych => Source::Filtered(
                EventTable::Inpatient,
                Predicate::equals(Column::known(columns::ADMISSION_TYPE), "Psych Unit / Facility"),
            ),
            EventCategory::Er => Source::UnionAll(vec![
                Source::Table(EventTable::ErOnly),
                er_admissions(),
            ]),
            EventCategory::ErOnly => Source::Table(EventTable::ErOnly),
            EventCategory::InpatientSnf => Source::Table(EventTable::InpatientSnf),
            EventCategory::Falls => Source::Table(EventTable::Falls),
            EventCategory::MedErrors => Source::Table(EventTable::MedErrors),
            EventCategory::Burns => Source::Table(EventTable::Burns),
            EventCategory::Infections => Source::Table(EventTable::Infections),
            EventCategory::Wounds => Source::Table(EventTable::Wounds),
            EventCategory::Grievances => Source::Table(EventTable::Grievances),
        }
    }

    /// Source for length-of-stay measures
    ///
    /// ER categories measure stays on inpatient admissions that came
    /// through the ER.
    pub fn stay_source(&self) -> Source {
        if self.is_er() {
            er_admissions()
        } else {
            self.visit_source()
        }
    }
}

/// Inpatient admissions flagged as arriving through the ER
pub fn er_admissions() -> Source {
    Source::Filtered(
        EventTable::Inpatient,
        Predicate::equals(Column::known(columns::ER), 1_i64),
    )
}

/// Acute hospital admissions flagged as arriving through the ER
pub fn er_to_acute_admissions() -> Source {
    Source::Filtered(
        EventTable::Inpatient,
        Predicate::equals(Column::known(columns::ADMISSION_TYPE), "Acute Hospital")
            .and(Predicate::equals(Column::known(columns::ER), 1_i64)),
    )
}
