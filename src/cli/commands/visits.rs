//! Visits command implementation
//!
//! Prints a bucketed visit chart: rates per 100 member-months, shares of
//! the bucket total, or raw counts.

use super::common::{open_service, print_json, render_matrix, report, FilterArgs, RangeArgs, EXIT_OK};
use crate::core::aggregate::AggregateRequest;
use crate::core::ordering::TopN;
use crate::core::service::{VisitMeasure, VisitRateRequest};
use crate::domain::{DateField, EventCategory, Granularity};
use clap::Args;

/// Arguments for the visits command
#[derive(Args, Debug)]
pub struct VisitsArgs {
    /// Event category (inpatient, er, falls, grievances, ...)
    #[arg(long)]
    pub category: EventCategory,

    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Bucket size (month or quarter)
    #[arg(long, default_value = "month")]
    pub granularity: Granularity,

    /// Date used for bucketing admissions (admission or discharge)
    #[arg(long)]
    pub date_field: Option<DateField>,

    /// What to plot (per_100mm, percent_of_total, count)
    #[arg(long, default_value = "per_100mm")]
    pub measure: VisitMeasure,

    /// Number of series to show (5, 10, all)
    #[arg(long, default_value = "all")]
    pub top: TopN,

    /// Exclude participants at or above the outlier threshold
    #[arg(long)]
    pub remove_outliers: bool,
}

impl VisitsArgs {
    fn request(&self) -> crate::domain::Result<VisitRateRequest> {
        let mut aggregate =
            AggregateRequest::new(self.category, self.range.date_range()?, self.granularity)
                .with_org(self.range.org_filter()?)
                .with_filter(self.filter.to_spec()?);
        if let Some(field) = self.date_field {
            aggregate = aggregate.with_date_field(field);
        }

        let mut request = VisitRateRequest::new(aggregate)
            .with_measure(self.measure)
            .with_top_n(self.top);
        if self.remove_outliers {
            request = request.without_outliers();
        }
        Ok(request)
    }

    /// Execute the visits command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let request = match self.request() {
            Ok(r) => r,
            Err(e) => return Ok(report(&e)),
        };
        let (service, _) = match open_service(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let chart = match service.visit_rate(&request).await {
            Ok(c) => c,
            Err(e) => return Ok(report(&e)),
        };

        if self.range.json {
            return Ok(print_json(&chart));
        }
        println!("{} visits ({})", self.category, chart.measure);
        print!("{}", render_matrix(&chart.values));
        Ok(EXIT_OK)
    }
}
