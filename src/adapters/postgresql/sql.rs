//! SQL rendering for PostgreSQL
//!
//! Renders [`EventQuery`] trees into parameterized SQL. Every value is
//! bound as a `$n` placeholder with an explicit cast; identifiers come from
//! [`EventTable`] names and validated [`AttributeName`]s and are always
//! double-quoted.
//!
//! Event reads have the shape
//!
//! ```sql
//! SELECT u.member_id, <center>, u.event_date, u."col", ...
//! FROM (
//!     SELECT CAST(member_id AS TEXT) AS member_id, CAST(<date column> AS DATE) AS event_date, "col", ...
//!     FROM <table> [WHERE <branch predicate>]
//!     [UNION ALL ...]
//! ) AS u
//! [JOIN enrollment e ON u.member_id = CAST(e.member_id AS TEXT)]
//! WHERE u.event_date BETWEEN $a::DATE AND $b::DATE [AND <predicate>] [AND e.center = $n::TEXT]
//! ```

use crate::core::query::{Column, EventQuery, Predicate};
use crate::domain::{columns, AttributeName, DateField, EventTable, OrgFilter, Result, StoreError, Value};

/// Enrollment table joined for organizational filtering
pub const ENROLLMENT_TABLE: &str = "enrollment";

/// Rendered statement with its parameters in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Where a predicate is being rendered
#[derive(Clone, Copy)]
enum Scope {
    /// Inside one union branch, reading `table` directly
    Branch(EventTable),
    /// On the wrapped union, where the query date is `u.event_date`
    Outer(DateField),
}

struct Renderer {
    params: Vec<Value>,
}

impl Renderer {
    fn bind(&mut self, value: &Value) -> String {
        self.params.push(value.clone());
        let n = self.params.len();
        match value {
            Value::Integer(_) => format!("${n}::BIGINT"),
            Value::Number(_) => format!("${n}::DOUBLE PRECISION"),
            Value::Date(_) => format!("${n}::DATE"),
            Value::Text(_) | Value::Null => format!("${n}::TEXT"),
        }
    }

    fn column(&self, column: &Column, scope: Scope, value: Option<&Value>) -> Result<String> {
        let sql = match (column, scope) {
            (Column::ParticipantId, Scope::Branch(_)) => {
                format!("CAST({} AS TEXT)", quote(columns::PARTICIPANT_ID))
            }
            (Column::ParticipantId, Scope::Outer(_)) => "u.member_id".to_string(),
            (Column::OrgUnit, _) => {
                return Err(StoreError::UnsupportedQuery(
                    "organizational unit predicates are expressed through the org filter"
                        .to_string(),
                )
                .into())
            }
            (Column::Date(field), Scope::Branch(table)) => {
                format!("CAST({} AS DATE)", quote(table.date_column(*field)))
            }
            (Column::Date(field), Scope::Outer(query_field)) => {
                if *field != query_field {
                    return Err(StoreError::UnsupportedQuery(format!(
                        "predicate on {field} date in a query keyed on {query_field} date"
                    ))
                    .into());
                }
                "u.event_date".to_string()
            }
            (Column::Attribute(name), scope) => {
                let qualified = match scope {
                    Scope::Branch(_) => quote(name.as_str()),
                    Scope::Outer(_) => format!("u.{}", quote(name.as_str())),
                };
                // Text literals compare against the column's text form so
                // categorical columns of any storage type match
                if matches!(value, Some(Value::Text(_))) {
                    format!("CAST({qualified} AS TEXT)")
                } else {
                    qualified
                }
            }
        };
        Ok(sql)
    }

    fn predicate(&mut self, predicate: &Predicate, scope: Scope) -> Result<Option<String>> {
        let sql = match predicate {
            Predicate::Always => return Ok(None),
            Predicate::Eq(column, value) => {
                let col = self.column(column, scope, Some(value))?;
                format!("{col} = {}", self.bind(value))
            }
            Predicate::Compare(column, op, value) => {
                let col = self.column(column, scope, Some(value))?;
                format!("{col} {} {}", op.symbol(), self.bind(value))
            }
            Predicate::Between(column, low, high) => {
                let col = self.column(column, scope, Some(low))?;
                let low = self.bind(low);
                let high = self.bind(high);
                format!("{col} BETWEEN {low} AND {high}")
            }
            Predicate::In(column, values) => {
                if values.is_empty() {
                    return Ok(Some("FALSE".to_string()));
                }
                let col = self.column(column, scope, values.first())?;
                let placeholders: Vec<String> = values.iter().map(|v| self.bind(v)).collect();
                format!("{col} IN ({})", placeholders.join(", "))
            }
            Predicate::IsNull(column) => {
                format!("{} IS NULL", self.column(column, scope, None)?)
            }
            Predicate::And(parts) => {
                let mut rendered = Vec::new();
                for part in parts {
                    if let Some(sql) = self.predicate(part, scope)? {
                        rendered.push(sql);
                    }
                }
                if rendered.is_empty() {
                    return Ok(None);
                }
                rendered.join(" AND ")
            }
        };
        Ok(Some(sql))
    }
}

/// Double-quotes an identifier
fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

fn projection(names: &[AttributeName]) -> String {
    names
        .iter()
        .map(|n| format!(", {}", quote(n.as_str())))
        .collect()
}

/// Renders an event read
///
/// # Errors
///
/// Returns `UnsupportedQuery` for predicate shapes this backend does not
/// express (organizational unit columns, or a date other than the query's
/// own date field outside a union branch)
pub fn render_event_query(query: &EventQuery) -> Result<RenderedQuery> {
    let mut renderer = Renderer { params: Vec::new() };
    let selected = query.selected_columns();
    let branch_columns = projection(&selected);

    let mut branches = Vec::new();
    for (table, predicate) in query.source.branches() {
        let mut sql = format!(
            "SELECT CAST({} AS TEXT) AS member_id, CAST({} AS DATE) AS event_date{} FROM {}",
            quote(columns::PARTICIPANT_ID),
            quote(table.date_column(query.date_field)),
            branch_columns,
            quote(table.name()),
        );
        if let Some(filter) = renderer.predicate(predicate, Scope::Branch(table))? {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        branches.push(sql);
    }

    let joined = query.org.unit().is_some();
    let center = if joined {
        format!("CAST(e.{} AS TEXT) AS center", quote(columns::CENTER))
    } else {
        "CAST(NULL AS TEXT) AS center".to_string()
    };
    let outer_columns: String = selected
        .iter()
        .map(|n| format!(", u.{}", quote(n.as_str())))
        .collect();

    let mut sql = format!(
        "SELECT u.member_id, {center}, u.event_date{outer_columns} FROM ({}) AS u",
        branches.join(" UNION ALL ")
    );
    if joined {
        sql.push_str(&format!(
            " JOIN {} e ON u.member_id = CAST(e.{} AS TEXT)",
            quote(ENROLLMENT_TABLE),
            quote(columns::PARTICIPANT_ID)
        ));
    }

    let start = renderer.bind(&Value::Date(query.range.start));
    let end = renderer.bind(&Value::Date(query.range.end));
    sql.push_str(&format!(" WHERE u.event_date BETWEEN {start} AND {end}"));

    if let Some(filter) = renderer.predicate(&query.predicate, Scope::Outer(query.date_field))? {
        sql.push_str(" AND ");
        sql.push_str(&filter);
    }

    if let Some(unit) = query.org.unit() {
        let placeholder = renderer.bind(&Value::Text(unit.as_str().to_string()));
        sql.push_str(&format!(
            " AND CAST(e.{} AS TEXT) = {placeholder}",
            quote(columns::CENTER)
        ));
    }

    Ok(RenderedQuery {
        sql,
        params: renderer.params,
    })
}

/// Renders the enrollment read
pub fn render_enrollment_query(org: &OrgFilter) -> RenderedQuery {
    let mut sql = format!(
        "SELECT CAST({} AS TEXT) AS member_id, CAST({} AS TEXT) AS center, enrollment_date, disenrollment_date FROM {}",
        quote(columns::PARTICIPANT_ID),
        quote(columns::CENTER),
        quote(ENROLLMENT_TABLE),
    );
    let mut params = Vec::new();
    if let Some(unit) = org.unit() {
        sql.push_str(&format!(" WHERE CAST({} AS TEXT) = $1::TEXT", quote(columns::CENTER)));
        params.push(Value::Text(unit.as_str().to_string()));
    }
    RenderedQuery { sql, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{CompareOp, Source};
    use crate::domain::{DateRange, EventCategory};
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
        )
    }

    #[test]
    fn test_single_table_read() {
        let query = EventQuery::new(Source::Table(EventTable::Falls), DateField::Occurrence, range());
        let rendered = render_event_query(&query).unwrap();

        assert_eq!(
            rendered.sql,
            "SELECT u.member_id, CAST(NULL AS TEXT) AS center, u.event_date FROM \
             (SELECT CAST(\"member_id\" AS TEXT) AS member_id, CAST(\"date_time_occurred\" AS DATE) AS event_date \
             FROM \"falls\") AS u WHERE u.event_date BETWEEN $1::DATE AND $2::DATE"
        );
        assert_eq!(rendered.params, query.bound_params());
    }

    #[test]
    fn test_er_union_with_filter_and_org() {
        let query = EventQuery::new(EventCategory::Er.visit_source(), DateField::Admission, range())
            .with_predicate(Predicate::equals(Column::known("dow"), "Friday"))
            .with_org("Westerly".parse().unwrap());
        let rendered = render_event_query(&query).unwrap();

        assert!(rendered.sql.contains(" UNION ALL "));
        assert!(rendered.sql.contains("FROM \"inpatient\" WHERE \"er\" = $1::BIGINT"));
        assert!(rendered.sql.contains("BETWEEN $2::DATE AND $3::DATE"));
        assert!(rendered.sql.contains("AND CAST(u.\"dow\" AS TEXT) = $4::TEXT"));
        assert!(rendered.sql.contains("JOIN \"enrollment\" e"));
        assert!(rendered.sql.ends_with("AND CAST(e.\"center\" AS TEXT) = $5::TEXT"));
        // both branches project the filter column
        assert_eq!(rendered.sql.matches(", \"dow\" FROM").count(), 2);
        assert_eq!(rendered.params, query.bound_params());
    }

    #[test]
    fn test_numeric_window() {
        let days = Column::known("days_since_last_admission");
        let query = EventQuery::new(
            EventCategory::Inpatient.visit_source(),
            DateField::Admission,
            range(),
        )
        .with_predicate(Predicate::Between(days.clone(), Value::Integer(1), Value::Integer(30)))
        .with_predicate(Predicate::Compare(days, CompareOp::Ne, Value::Integer(0)));
        let rendered = render_event_query(&query).unwrap();

        assert!(rendered
            .sql
            .contains("u.\"days_since_last_admission\" BETWEEN $4::BIGINT AND $5::BIGINT"));
        assert!(rendered.sql.contains("u.\"days_since_last_admission\" <> $6::BIGINT"));
        assert_eq!(rendered.params, query.bound_params());
    }

    #[test]
    fn test_severity_in_list() {
        let query = EventQuery::new(Source::Table(EventTable::Falls), DateField::Occurrence, range())
            .with_predicate(Predicate::In(
                Column::known("severity"),
                vec!["Major Harm".into(), "Death".into()],
            ));
        let rendered = render_event_query(&query).unwrap();
        assert!(rendered
            .sql
            .contains("CAST(u.\"severity\" AS TEXT) IN ($3::TEXT, $4::TEXT)"));
    }

    #[test]
    fn test_timestamp_dates_compare_as_dates() {
        let query = EventQuery::new(EventCategory::Er.visit_source(), DateField::Admission, range());
        let rendered = render_event_query(&query).unwrap();

        // each union branch truncates its date column
        assert_eq!(rendered.sql.matches("CAST(\"admission_date\" AS DATE) AS event_date").count(), 2);
        assert!(!rendered.sql.contains(", \"admission_date\" AS event_date"));
    }

    #[test]
    fn test_branch_date_predicate_is_truncated() {
        let query = EventQuery::new(
            Source::Filtered(
                EventTable::Inpatient,
                Predicate::IsNull(Column::Date(DateField::Discharge)),
            ),
            DateField::Admission,
            range(),
        );
        let rendered = render_event_query(&query).unwrap();
        assert!(rendered.sql.contains("WHERE CAST(\"discharge_date\" AS DATE) IS NULL"));
    }

    #[test]
    fn test_numeric_looking_filter_value_compares_as_text() {
        let compiled = crate::core::filter::FilterSpec::by_column("zip")
            .unwrap()
            .with_value("02906")
            .compile()
            .unwrap();
        let query = EventQuery::new(Source::Table(EventTable::Falls), DateField::Occurrence, range())
            .with_predicate(compiled.predicate);
        let rendered = render_event_query(&query).unwrap();

        assert!(rendered.sql.ends_with("AND CAST(u.\"zip\" AS TEXT) = $3::TEXT"));
        assert_eq!(rendered.params[2], Value::Text("02906".into()));
        assert!(!rendered.sql.contains("BIGINT"));
    }

    #[test]
    fn test_foreign_date_predicate_unsupported() {
        let query = EventQuery::new(
            EventCategory::Inpatient.visit_source(),
            DateField::Discharge,
            range(),
        )
        .with_predicate(Predicate::IsNull(Column::Date(DateField::Admission)));
        assert!(render_event_query(&query).is_err());
    }

    #[test]
    fn test_enrollment_query() {
        let all = render_enrollment_query(&OrgFilter::All);
        assert!(all.params.is_empty());
        assert!(!all.sql.contains("WHERE"));

        let unit = render_enrollment_query(&"Providence".parse().unwrap());
        assert!(unit.sql.ends_with("WHERE CAST(\"center\" AS TEXT) = $1::TEXT"));
        assert_eq!(unit.params, vec![Value::Text("Providence".into())]);
    }
}
