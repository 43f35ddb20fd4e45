//! Length-of-stay command implementation

use super::common::{open_service, print_json, render_matrix, report, FilterArgs, RangeArgs, EXIT_OK};
use crate::core::aggregate::{AggregateRequest, Reducer};
use crate::core::ordering::TopN;
use crate::core::rates::RateValue;
use crate::core::service::StayType;
use crate::domain::{EventCategory, Granularity};
use clap::Args;
use serde::Serialize;

/// Arguments for the los command
#[derive(Args, Debug)]
pub struct LosArgs {
    /// Admission category (inpatient, inpatient_psych, er, er_only, inpatient_snf)
    #[arg(long)]
    pub category: EventCategory,

    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Bucket size (month or quarter)
    #[arg(long, default_value = "month")]
    pub granularity: Granularity,

    /// Sum days instead of averaging them
    #[arg(long)]
    pub total: bool,

    /// Number of series to show (5, 10, all)
    #[arg(long, default_value = "all")]
    pub top: TopN,

    /// Exclude participants at or above the outlier threshold
    #[arg(long)]
    pub remove_outliers: bool,

    /// Report skilled nursing days of one stay type (skilled, custodial,
    /// respite) per 100 member-months instead of the chart
    #[arg(long)]
    pub stay_type: Option<StayType>,
}

#[derive(Serialize)]
struct StayDays {
    stay_type: StayType,
    days_per_100mm: RateValue,
}

impl LosArgs {
    fn reducer(&self) -> Reducer {
        if self.total {
            Reducer::Sum
        } else {
            Reducer::Mean
        }
    }

    fn request(&self) -> crate::domain::Result<AggregateRequest> {
        Ok(
            AggregateRequest::new(self.category, self.range.date_range()?, self.granularity)
                .with_org(self.range.org_filter()?)
                .with_filter(self.filter.to_spec()?),
        )
    }

    /// Execute the los command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let request = match self.request() {
            Ok(r) => r,
            Err(e) => return Ok(report(&e)),
        };
        let (service, _) = match open_service(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        if let Some(stay_type) = self.stay_type {
            let days = match service
                .stay_days_per_100mm(stay_type, &request.org, &request.range, &request.filter)
                .await
            {
                Ok(d) => d,
                Err(e) => return Ok(report(&e)),
            };
            if self.range.json {
                return Ok(print_json(&StayDays {
                    stay_type,
                    days_per_100mm: days,
                }));
            }
            println!("{} days per 100 member-months: {days}", stay_type.as_str());
            return Ok(EXIT_OK);
        }

        let chart = match service
            .length_of_stay(&request, self.reducer(), self.top, self.remove_outliers)
            .await
        {
            Ok(c) => c,
            Err(e) => return Ok(report(&e)),
        };

        if self.range.json {
            return Ok(print_json(&chart));
        }
        println!("{} length of stay ({:?})", self.category, chart.reducer);
        print!("{}", render_matrix(&chart.values));
        Ok(EXIT_OK)
    }
}
