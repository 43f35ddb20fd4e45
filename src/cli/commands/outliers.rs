//! Outliers command implementation

use super::common::{open_service, print_json, report, RangeArgs, EXIT_OK};
use crate::domain::EventCategory;
use clap::Args;

/// Arguments for the outliers command
#[derive(Args, Debug)]
pub struct OutliersArgs {
    /// Event category
    #[arg(long)]
    pub category: EventCategory,

    #[command(flatten)]
    pub range: RangeArgs,
}

impl OutliersArgs {
    /// Execute the outliers command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (range, org) = match (self.range.date_range(), self.range.org_filter()) {
            (Ok(range), Ok(org)) => (range, org),
            (Err(e), _) | (_, Err(e)) => return Ok(report(&e)),
        };
        let (service, _) = match open_service(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let summary = match service.outlier_summary(self.category, &org, &range).await {
            Ok(s) => s,
            Err(e) => return Ok(report(&e)),
        };

        if self.range.json {
            return Ok(print_json(&summary));
        }
        let threshold = summary
            .threshold
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "N/A".to_string());
        println!("Repeat participants:        {}", summary.repeat_participants);
        println!("Events by repeaters (%):    {}", summary.percent_by_repeaters);
        println!("Outlier participants:       {}", summary.outlier_participants);
        println!("Outlier threshold:          {threshold}");
        Ok(EXIT_OK)
    }
}
