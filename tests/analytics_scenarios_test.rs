//! End-to-end analytics scenarios against the in-memory event store

use chrono::{Days, NaiveDate};
use pacemetrics::adapters::memory::MemoryStore;
use pacemetrics::core::aggregate::{AggregateRequest, Reducer};
use pacemetrics::core::filter::FilterSpec;
use pacemetrics::core::ordering::TopN;
use pacemetrics::core::period::PeriodBucketer;
use pacemetrics::core::rates::RateValue;
use pacemetrics::core::service::{AnalyticsService, VisitMeasure, VisitRateRequest};
use pacemetrics::domain::{
    AnalyticsError, DateField, DateRange, EnrollmentInterval, EventCategory, EventRecord,
    EventTable, Granularity, OrgFilter, OrgUnit, ParticipantId,
};
use std::sync::Arc;
use test_case::test_case;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn roster(n: usize) -> Vec<EnrollmentInterval> {
    (0..n)
        .map(|i| {
            EnrollmentInterval::new(format!("p{i}"), None, d(2023, 1, 1), Some(d(2023, 12, 31)))
                .unwrap()
        })
        .collect()
}

fn admission(id: &str, date: NaiveDate, days_since: Option<i64>) -> EventRecord {
    let record = EventRecord::new(ParticipantId::new(id).unwrap(), EventTable::Inpatient)
        .with_date(DateField::Admission, date)
        .with_attribute("admission_type", "Acute Hospital");
    match days_since {
        Some(days) => record.with_attribute("days_since_last_admission", days),
        None => record,
    }
}

fn fall(id: &str, date: NaiveDate) -> EventRecord {
    EventRecord::new(ParticipantId::new(id).unwrap(), EventTable::Falls)
        .with_date(DateField::Occurrence, date)
}

fn er_visit(id: &str, date: NaiveDate, facility: &str, dow: &str) -> EventRecord {
    EventRecord::new(ParticipantId::new(id).unwrap(), EventTable::ErOnly)
        .with_date(DateField::Admission, date)
        .with_attribute("facility", facility)
        .with_attribute("dow", dow)
}

fn service(enrollment: Vec<EnrollmentInterval>, events: Vec<EventRecord>) -> AnalyticsService {
    AnalyticsService::with_defaults(Arc::new(MemoryStore::new(enrollment, events)))
}

fn q1() -> DateRange {
    DateRange::new(d(2023, 1, 1), d(2023, 3, 31))
}

#[tokio::test]
async fn test_full_roster_census_is_constant() {
    let svc = service(roster(10), Vec::new());
    let census = svc
        .census_series(&OrgFilter::All, &q1(), Granularity::Month)
        .await
        .unwrap();

    let labels: Vec<String> = census.iter().map(|p| p.bucket.to_string()).collect();
    assert_eq!(labels, vec!["2023-01", "2023-02", "2023-03"]);
    assert!(census.iter().all(|p| p.census == 10));
}

#[tokio::test]
async fn test_census_by_org_unit() {
    let mut enrollment = roster(4);
    enrollment.push(
        EnrollmentInterval::new(
            "w1",
            Some(OrgUnit::new("Westerly").unwrap()),
            d(2022, 6, 1),
            None,
        )
        .unwrap(),
    );
    let svc = service(enrollment, Vec::new());
    let westerly: OrgFilter = "Westerly".parse().unwrap();

    let census = svc
        .census_series(&westerly, &q1(), Granularity::Quarter)
        .await
        .unwrap();
    assert_eq!(census.len(), 1);
    assert_eq!(census.total(), 1);
    assert_eq!(svc.total_census(&OrgFilter::All, &q1()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_february_readmit_rate() {
    let events: Vec<EventRecord> = (0..10)
        .map(|i| {
            let days = if i < 3 { Some(15) } else { None };
            admission(&format!("p{i}"), d(2023, 2, 10), days)
        })
        .collect();
    let svc = service(roster(10), events);

    let february = DateRange::new(d(2023, 2, 1), d(2023, 2, 28));
    let rate = svc
        .readmit_rate(
            EventCategory::Inpatient,
            &OrgFilter::All,
            &february,
            30,
            &FilterSpec::default(),
        )
        .await
        .unwrap();

    assert_eq!(rate.admissions, 10);
    assert_eq!(rate.readmissions, 3);
    assert_eq!(rate.rate_percent, RateValue::Value(30.0));
}

#[test_case(30, 1 ; "day thirty is a readmit")]
#[test_case(31, 0 ; "day thirty one is not")]
#[test_case(0, 0 ; "same day is an admission only")]
#[tokio::test]
async fn test_readmit_window_boundary(days_since: i64, expected: u64) {
    let svc = service(roster(1), vec![admission("p0", d(2023, 2, 10), Some(days_since))]);
    let rate = svc
        .readmit_rate(
            EventCategory::Inpatient,
            &OrgFilter::All,
            &q1(),
            30,
            &FilterSpec::default(),
        )
        .await
        .unwrap();

    assert_eq!(rate.admissions, 1);
    assert_eq!(rate.readmissions, expected);
}

#[tokio::test]
async fn test_readmit_without_admissions_is_not_available() {
    let svc = service(roster(3), Vec::new());
    let rate = svc
        .readmit_rate(EventCategory::Er, &OrgFilter::All, &q1(), 30, &FilterSpec::default())
        .await
        .unwrap();
    assert_eq!(rate.rate_percent, RateValue::NotAvailable);
}

#[tokio::test]
async fn test_er_readmissions_come_from_flagged_admissions() {
    let events = vec![
        EventRecord::new(ParticipantId::new("p0").unwrap(), EventTable::ErOnly)
            .with_date(DateField::Admission, d(2023, 2, 1))
            .with_attribute("days_since_last_admission", 10_i64),
        EventRecord::new(ParticipantId::new("p1").unwrap(), EventTable::Inpatient)
            .with_date(DateField::Admission, d(2023, 2, 2))
            .with_attribute("admission_type", "Acute Hospital")
            .with_attribute("er", 1_i64)
            .with_attribute("days_since_last_admission", 12_i64),
    ];
    let svc = service(roster(2), events);
    let none = FilterSpec::default();

    for category in [EventCategory::Er, EventCategory::ErOnly] {
        let rate = svc
            .readmit_rate(category, &OrgFilter::All, &q1(), 30, &none)
            .await
            .unwrap();
        assert_eq!(rate.admissions, 1, "{category}");
        assert_eq!(rate.readmissions, 1, "{category}");
        assert_eq!(rate.rate_percent, RateValue::Value(100.0));
    }
}

#[tokio::test]
async fn test_er_visit_alone_is_not_an_admission() {
    let events = vec![EventRecord::new(ParticipantId::new("p0").unwrap(), EventTable::ErOnly)
        .with_date(DateField::Admission, d(2023, 2, 1))
        .with_attribute("days_since_last_admission", 10_i64)];
    let svc = service(roster(1), events);

    let rate = svc
        .readmit_rate(EventCategory::ErOnly, &OrgFilter::All, &q1(), 30, &FilterSpec::default())
        .await
        .unwrap();
    assert_eq!(rate.admissions, 0);
    assert_eq!(rate.rate_percent, RateValue::NotAvailable);
}

#[tokio::test]
async fn test_empty_category_gives_full_length_series() {
    let request = VisitRateRequest::new(AggregateRequest::new(
        EventCategory::Grievances,
        q1(),
        Granularity::Month,
    ));

    let with_census = service(roster(10), Vec::new()).visit_rate(&request).await.unwrap();
    assert_eq!(with_census.values.series.len(), 1);
    assert_eq!(
        with_census.values.series[0].values,
        vec![RateValue::Value(0.0); 3]
    );

    let no_roster = service(Vec::new(), Vec::new()).visit_rate(&request).await.unwrap();
    assert_eq!(
        no_roster.values.series[0].values,
        vec![RateValue::NotAvailable; 3]
    );
}

#[tokio::test]
async fn test_visits_per_100_member_months() {
    let events = vec![
        fall("p1", d(2023, 1, 5)),
        fall("p2", d(2023, 1, 9)),
        fall("p3", d(2023, 3, 30)),
        // Outside the range once April is dropped as a partial month
        fall("p4", d(2023, 4, 2)),
    ];
    let svc = service(roster(10), events);
    let range = DateRange::new(d(2023, 1, 1), d(2023, 4, 10));
    let chart = svc
        .visit_rate(&VisitRateRequest::new(AggregateRequest::new(
            EventCategory::Falls,
            range,
            Granularity::Month,
        )))
        .await
        .unwrap();

    assert_eq!(chart.values.buckets.len(), 3);
    assert_eq!(
        chart.values.series[0].values,
        vec![RateValue::Value(20.0), RateValue::Value(0.0), RateValue::Value(10.0)]
    );
    assert_eq!(chart.counts.grand_total(), 3);
}

#[tokio::test]
async fn test_rate_round_trip_recovers_counts() {
    let events: Vec<EventRecord> = (0..7).map(|i| fall(&format!("p{i}"), d(2023, 2, 3))).collect();
    let svc = service(roster(9), events);
    let chart = svc
        .visit_rate(&VisitRateRequest::new(AggregateRequest::new(
            EventCategory::Falls,
            q1(),
            Granularity::Month,
        )))
        .await
        .unwrap();

    let census = chart.census.as_ref().unwrap();
    for (i, bucket) in chart.values.buckets.iter().enumerate() {
        let rate = chart.values.series[0].values[i].value().unwrap();
        let recovered = rate * census.get(bucket).unwrap() as f64 / 100.0;
        assert!((recovered - chart.counts.series[0].values[i] as f64).abs() < 0.01);
    }
}

#[tokio::test]
async fn test_er_counts_both_constituents() {
    let events = vec![
        er_visit("p1", d(2023, 1, 3), "Miriam", "Monday"),
        EventRecord::new(ParticipantId::new("p2").unwrap(), EventTable::Inpatient)
            .with_date(DateField::Admission, d(2023, 1, 4))
            .with_attribute("er", 1_i64),
        EventRecord::new(ParticipantId::new("p3").unwrap(), EventTable::Inpatient)
            .with_date(DateField::Admission, d(2023, 1, 5))
            .with_attribute("er", 0_i64),
    ];
    let svc = service(roster(10), events);
    let chart = svc
        .visit_rate(
            &VisitRateRequest::new(AggregateRequest::new(
                EventCategory::Er,
                q1(),
                Granularity::Month,
            ))
            .with_measure(VisitMeasure::Count),
        )
        .await
        .unwrap();

    assert_eq!(chart.counts.series[0].values, vec![2, 0, 0]);
}

fn facility_visits() -> Vec<EventRecord> {
    let mut events = Vec::new();
    let mut day = d(2023, 1, 2);
    for (facility, dow, n) in [
        ("Miriam", "Monday", 6),
        ("Miriam", "Friday", 1),
        ("Kent", "Monday", 1),
        ("Kent", "Friday", 4),
        ("Landmark", "Friday", 2),
    ] {
        for _ in 0..n {
            events.push(er_visit("p1", day, facility, dow));
            day = day.checked_add_days(Days::new(1)).unwrap();
        }
    }
    events
}

#[tokio::test]
async fn test_series_order_ignores_secondary_filter() {
    let svc = service(roster(10), facility_visits());
    let base = AggregateRequest::new(EventCategory::ErOnly, q1(), Granularity::Quarter);

    let mut orders = Vec::new();
    for secondary in ["Monday", "Friday"] {
        let filter = FilterSpec::by_column("facility")
            .unwrap()
            .with_secondary(secondary);
        let chart = svc
            .visit_rate(&VisitRateRequest::new(base.clone().with_filter(filter)))
            .await
            .unwrap();
        orders.push((chart.order.clone(), chart.values.series_names()));
    }

    let (monday_order, monday_shown) = &orders[0];
    let (friday_order, friday_shown) = &orders[1];
    assert_eq!(monday_order, friday_order);
    assert_eq!(monday_order, &vec!["Miriam", "Kent", "Landmark"]);

    // Friday volume favours Kent, but the display order does not change
    assert_eq!(friday_shown, &vec!["Miriam", "Kent", "Landmark"]);
    assert_eq!(monday_shown, &vec!["Miriam", "Kent"]);
}

#[tokio::test]
async fn test_top_n_truncates_after_ordering() {
    let svc = service(roster(10), facility_visits());
    let request = VisitRateRequest::new(
        AggregateRequest::new(EventCategory::ErOnly, q1(), Granularity::Quarter)
            .with_filter(FilterSpec::by_column("facility").unwrap()),
    )
    .with_measure(VisitMeasure::PercentOfTotal)
    .with_top_n(TopN::Five);
    let chart = svc.visit_rate(&request).await.unwrap();

    assert_eq!(chart.styles.len(), 3);
    assert_eq!(chart.styles[0].name, "Miriam");
    let miriam = chart.values.series("Miriam").unwrap();
    assert_eq!(miriam.values, vec![RateValue::Value(50.0)]);
}

#[tokio::test]
async fn test_unknown_secondary_filter_fails() {
    let svc = service(roster(10), facility_visits());
    let request = VisitRateRequest::new(
        AggregateRequest::new(EventCategory::ErOnly, q1(), Granularity::Month)
            .with_filter(FilterSpec::default().with_secondary("Blursday")),
    );
    let err = svc.visit_rate(&request).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidFilter(ref v) if v == "Blursday"));
    assert!(err.is_caller_error());
}

#[tokio::test]
async fn test_outlier_exclusion_before_bucketing() {
    // p0 has 6 falls, p1 and p2 two each: mean 3.33, std 1.89, cutoff 5
    let mut events: Vec<EventRecord> = (0..6).map(|_| fall("p0", d(2023, 1, 10))).collect();
    events.extend((0..2).map(|_| fall("p1", d(2023, 2, 10))));
    events.extend((0..2).map(|_| fall("p2", d(2023, 3, 10))));
    events.push(fall("p3", d(2023, 3, 11)));
    let svc = service(roster(10), events);

    let summary = svc
        .outlier_summary(EventCategory::Falls, &OrgFilter::All, &q1())
        .await
        .unwrap();
    assert_eq!(summary.repeat_participants, 3);
    assert_eq!(summary.outlier_participants, 1);
    assert_eq!(summary.percent_by_repeaters, RateValue::Value(90.91));

    let request = VisitRateRequest::new(AggregateRequest::new(
        EventCategory::Falls,
        q1(),
        Granularity::Month,
    ))
    .with_measure(VisitMeasure::Count)
    .without_outliers();
    let first = svc.visit_rate(&request).await.unwrap();
    let second = svc.visit_rate(&request).await.unwrap();
    assert_eq!(first.counts.series[0].values, vec![0, 2, 3]);
    assert_eq!(first, second);

    let total = svc
        .event_total(EventCategory::Falls, &OrgFilter::All, &q1(), true)
        .await
        .unwrap();
    assert_eq!(total, 5);
}

/// a and b fall twice in January; c once in January and four times in
/// early March, which a 03/10 end date trims away
fn trimmed_month_falls() -> Vec<EventRecord> {
    let mut events = vec![
        fall("a", d(2023, 1, 3)),
        fall("a", d(2023, 1, 4)),
        fall("b", d(2023, 1, 5)),
        fall("b", d(2023, 1, 6)),
        fall("c", d(2023, 1, 7)),
    ];
    events.extend((2..=5).map(|day| fall("c", d(2023, 3, day))));
    events
}

#[tokio::test]
async fn test_outlier_threshold_ignores_trimmed_month() {
    let svc = service(roster(10), trimmed_month_falls());
    let chart_for = |range: DateRange| {
        VisitRateRequest::new(AggregateRequest::new(EventCategory::Falls, range, Granularity::Month))
            .with_measure(VisitMeasure::Count)
            .without_outliers()
    };

    let ragged = svc
        .visit_rate(&chart_for(DateRange::new(d(2023, 1, 1), d(2023, 3, 10))))
        .await
        .unwrap();
    let whole = svc
        .visit_rate(&chart_for(DateRange::new(d(2023, 1, 1), d(2023, 2, 28))))
        .await
        .unwrap();

    // Within January and February only a and b repeat, so they are excluded
    assert_eq!(ragged.counts.series[0].values, vec![1, 0]);
    assert_eq!(ragged.counts, whole.counts);
}

#[tokio::test]
async fn test_length_of_stay_outliers_use_plotted_window() {
    let stay = |id: &str, admitted: NaiveDate, los: i64| {
        admission(id, admitted, None)
            .with_date(DateField::Discharge, admitted.checked_add_days(Days::new(los as u64)).unwrap())
            .with_attribute("los", los)
    };
    let mut events = vec![
        stay("a", d(2023, 1, 2), 1),
        stay("a", d(2023, 1, 9), 1),
        stay("b", d(2023, 1, 3), 1),
        stay("b", d(2023, 1, 10), 1),
        stay("c", d(2023, 1, 4), 7),
    ];
    events.extend((2..=5).map(|day| stay("c", d(2023, 3, day), 2)));
    let svc = service(roster(10), events);

    let request = AggregateRequest::new(
        EventCategory::Inpatient,
        DateRange::new(d(2023, 1, 1), d(2023, 3, 10)),
        Granularity::Month,
    );
    let chart = svc
        .length_of_stay(&request, Reducer::Sum, TopN::All, true)
        .await
        .unwrap();

    assert_eq!(chart.values.buckets.len(), 2);
    assert_eq!(chart.values.series[0].values[0], RateValue::Value(7.0));
}

#[tokio::test]
async fn test_single_repeater_excludes_nobody() {
    let events = vec![fall("p0", d(2023, 1, 10)), fall("p0", d(2023, 1, 11)), fall("p1", d(2023, 1, 12))];
    let svc = service(roster(10), events);

    let summary = svc
        .outlier_summary(EventCategory::Falls, &OrgFilter::All, &q1())
        .await
        .unwrap();
    assert_eq!(summary.threshold, None);
    assert_eq!(summary.outlier_participants, 0);

    let total = svc
        .event_total(EventCategory::Falls, &OrgFilter::All, &q1(), true)
        .await
        .unwrap();
    assert_eq!(total, 3);
}

#[test_case("01/01/2023", "12/31/2023", Granularity::Month, 12 ; "calendar year by month")]
#[test_case("01/15/2023", "06/10/2023", Granularity::Month, 5 ; "partial trailing month dropped")]
#[test_case("02/15/2022", "03/31/2023", Granularity::Quarter, 5 ; "quarters from mid quarter start")]
#[test_case("03/31/2023", "01/01/2023", Granularity::Month, 0 ; "reversed range is empty")]
fn test_buckets_partition_range(start: &str, end: &str, granularity: Granularity, expected: usize) {
    let bucketer = PeriodBucketer::default();
    let range = DateRange::parse(start, end).unwrap();
    let normalized = bucketer.normalize(&range, granularity);
    let buckets = bucketer.bucket_sequence(&normalized, granularity);

    assert_eq!(buckets.len(), expected);
    if let (Some(first), Some(last)) = (buckets.first(), buckets.last()) {
        assert_eq!(first.start, normalized.start);
        assert_eq!(last.end, normalized.end);
    }
    for pair in buckets.windows(2) {
        assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
    }
}

#[test_case("13/45/2023" ; "impossible month and day")]
#[test_case("2023/01/01" ; "year first with slashes")]
#[test_case("Jan 1 2023" ; "free text")]
fn test_bad_date_is_caller_error(start: &str) {
    let err = DateRange::parse(start, "03/31/2023").unwrap_err();
    assert!(matches!(err, AnalyticsError::DateParse { .. }));
    assert!(err.is_caller_error());
}

#[test]
fn test_iso_dates_are_accepted() {
    let range = DateRange::parse("2023-01-01", "03/31/2023").unwrap();
    assert_eq!(range, q1());
}
