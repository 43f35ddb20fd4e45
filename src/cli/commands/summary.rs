//! Summary command implementation
//!
//! Prints the scalar cards for one category: totals, rates per 100
//! member-months, repeat participants and, where they apply, length of
//! stay, readmissions, ER conversions and severe incidents.

use super::common::{open_service, print_json, report, RangeArgs, EXIT_OK};
use crate::domain::EventCategory;
use clap::Args;

/// Arguments for the summary command
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Event category
    #[arg(long)]
    pub category: EventCategory,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Exclude participants at or above the outlier threshold from totals
    #[arg(long)]
    pub remove_outliers: bool,
}

impl SummaryArgs {
    /// Execute the summary command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (range, org) = match (self.range.date_range(), self.range.org_filter()) {
            (Ok(range), Ok(org)) => (range, org),
            (Err(e), _) | (_, Err(e)) => return Ok(report(&e)),
        };
        let (service, _) = match open_service(config_path).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let card = match service
            .scorecard(self.category, &org, &range, self.remove_outliers)
            .await
        {
            Ok(c) => c,
            Err(e) => return Ok(report(&e)),
        };

        if self.range.json {
            return Ok(print_json(&card));
        }

        println!("{} summary, {} ({})", card.category, card.range, org);
        println!("{}", "-".repeat(48));
        println!("{:<32} {:>12}", "Total census", card.total_census);
        println!("{:<32} {:>12}", "Events", card.event_total);
        println!("{:<32} {:>12}", "Events per 100 member-months", card.events_per_100mm.to_string());
        println!("{:<32} {:>12}", "Participants without event (%)", card.percent_without_event.to_string());
        println!("{:<32} {:>12}", "Repeat participants", card.outliers.repeat_participants);
        println!("{:<32} {:>12}", "Outlier participants", card.outliers.outlier_participants);
        if let Some(alos) = card.alos {
            println!("{:<32} {:>12}", "Average length of stay", alos.to_string());
        }
        if let Some(los) = card.los_per_100mm {
            println!("{:<32} {:>12}", "Days per 100 member-months", los.to_string());
        }
        if let Some(readmit) = card.readmit {
            println!("{:<32} {:>12}", "30-day readmit rate (%)", readmit.rate_percent.to_string());
        }
        if let Some(er) = card.er_to_inpatient {
            println!("{:<32} {:>12}", "ER visits", er.er_visits);
            println!("{:<32} {:>12}", "ER to acute admissions", er.er_to_acute);
            println!("{:<32} {:>12}", "ER to acute (%)", er.percent.to_string());
        }
        if let Some(severe) = card.severe_events {
            println!("{:<32} {:>12}", "Most severe incidents", severe);
        }
        Ok(EXIT_OK)
    }
}
