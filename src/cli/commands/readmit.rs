//! Readmit command implementation

use super::common::{open_service, print_json, report, FilterArgs, RangeArgs, EXIT_OK};
use crate::core::service::READMIT_WINDOW_DAYS;
use crate::domain::EventCategory;
use clap::Args;

/// Arguments for the readmit command
#[derive(Args, Debug)]
pub struct ReadmitArgs {
    /// Admission category (inpatient, inpatient_psych, er, er_only, inpatient_snf)
    #[arg(long)]
    pub category: EventCategory,

    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Days since the previous admission that still count as a readmission
    #[arg(long, default_value_t = READMIT_WINDOW_DAYS)]
    pub window_days: u32,
}

impl ReadmitArgs {
    /// Execute the readmit command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let inputs = self
            .range
            .date_range()
            .and_then(|range| Ok((range, self.range.org_filter()?, self.filter.to_spec()?)));
        let (range, org, filter) = match inputs {
            Ok(i) => i,
            Err(e) => return Ok(report(&e)),
        };
        let (service, _) = match open_service(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let rate = match service
            .readmit_rate(self.category, &org, &range, self.window_days, &filter)
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(report(&e)),
        };

        if self.range.json {
            return Ok(print_json(&rate));
        }
        println!("{}-day readmissions: {}", self.window_days, rate.readmissions);
        println!("Admissions:          {}", rate.admissions);
        println!("Readmit rate (%):    {}", rate.rate_percent);
        Ok(EXIT_OK)
    }
}
