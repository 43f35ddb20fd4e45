//! Census command implementation
//!
//! Prints enrolled participants per month or quarter.

use super::common::{open_service, print_json, render_census, report, RangeArgs, EXIT_OK};
use crate::domain::Granularity;
use clap::Args;

/// Arguments for the census command
#[derive(Args, Debug)]
pub struct CensusArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Bucket size (month or quarter)
    #[arg(long, default_value = "month")]
    pub granularity: Granularity,
}

impl CensusArgs {
    /// Execute the census command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (range, org) = match (self.range.date_range(), self.range.org_filter()) {
            (Ok(range), Ok(org)) => (range, org),
            (Err(e), _) | (_, Err(e)) => return Ok(report(&e)),
        };
        let (service, _) = match open_service(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        tracing::info!(org = %org, range = %range, granularity = %self.granularity, "Computing census");

        let series = match service.census_series(&org, &range, self.granularity).await {
            Ok(s) => s,
            Err(e) => return Ok(report(&e)),
        };

        if self.range.json {
            return Ok(print_json(&series));
        }
        print!("{}", render_census(&series));
        Ok(EXIT_OK)
    }
}
