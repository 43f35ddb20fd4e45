//! Repeat participants and outlier exclusion
//!
//! Participants with more than one event in range are "repeaters". The
//! outlier threshold is the mean plus one population standard deviation of
//! their event counts, and a repeater is an outlier when their count reaches
//! the threshold truncated toward zero.

use crate::core::aggregate::EventAggregator;
use crate::core::query::EventQuery;
use crate::core::rates::{RateNormalizer, RateValue};
use crate::domain::{DateRange, EventCategory, EventRecord, OrgFilter, ParticipantId, Result};
use crate::log_degenerate_threshold;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Per-participant event counts for one category and range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatCounts {
    /// Participants with more than one event, and their counts
    pub repeaters: BTreeMap<ParticipantId, u64>,
    /// Every event in range, repeaters or not
    pub total_events: u64,
}

impl RepeatCounts {
    pub fn from_rows(rows: &[EventRecord]) -> Self {
        let mut counts: BTreeMap<ParticipantId, u64> = BTreeMap::new();
        for row in rows {
            *counts.entry(row.participant_id.clone()).or_default() += 1;
        }
        counts.retain(|_, count| *count > 1);
        Self {
            repeaters: counts,
            total_events: rows.len() as u64,
        }
    }

    /// Events attributed to repeaters
    pub fn repeat_events(&self) -> u64 {
        self.repeaters.values().sum()
    }
}

/// Outlier cutoff and the participants it excludes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutlierThreshold {
    pub mean_repeat_count: Option<f64>,
    pub std_repeat_count: Option<f64>,
    /// `mean + std`; `None` when fewer than two repeaters exist
    pub threshold: Option<f64>,
    pub excluded_participant_ids: BTreeSet<ParticipantId>,
    /// Events attributed to the excluded participants
    pub excluded_events: u64,
}

impl OutlierThreshold {
    /// Threshold that excludes nobody
    pub fn none() -> Self {
        Self::default()
    }

    /// Computes the threshold from repeat counts
    ///
    /// # Examples
    ///
    /// ```
    /// use pacemetrics::core::outliers::{OutlierThreshold, RepeatCounts};
    /// use pacemetrics::domain::ParticipantId;
    ///
    /// let mut counts = RepeatCounts::default();
    /// for (id, n) in [("a", 2), ("b", 2), ("c", 5)] {
    ///     counts.repeaters.insert(ParticipantId::new(id).unwrap(), n);
    /// }
    /// let threshold = OutlierThreshold::from_counts(&counts);
    ///
    /// // mean 3, population std sqrt(2): threshold 4.41, cutoff 4
    /// assert_eq!(threshold.cutoff(), Some(4));
    /// assert_eq!(threshold.excluded_participant_ids.len(), 1);
    /// ```
    pub fn from_counts(counts: &RepeatCounts) -> Self {
        if counts.repeaters.len() < 2 {
            return Self::none();
        }

        let n = counts.repeaters.len() as f64;
        let mean = counts.repeaters.values().map(|&c| c as f64).sum::<f64>() / n;
        let variance = counts
            .repeaters
            .values()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();
        let threshold = mean + std;
        if !threshold.is_finite() {
            return Self::none();
        }

        let cutoff = threshold.trunc() as u64;
        let excluded: Vec<(&ParticipantId, &u64)> = counts
            .repeaters
            .iter()
            .filter(|(_, &count)| count >= cutoff)
            .collect();

        Self {
            mean_repeat_count: Some(mean),
            std_repeat_count: Some(std),
            threshold: Some(threshold),
            excluded_events: excluded.iter().map(|(_, &c)| c).sum(),
            excluded_participant_ids: excluded.into_iter().map(|(id, _)| id.clone()).collect(),
        }
    }

    /// Threshold truncated toward zero, the count at which exclusion starts
    pub fn cutoff(&self) -> Option<u64> {
        self.threshold.map(|t| t.trunc() as u64)
    }

    pub fn is_outlier(&self, participant: &ParticipantId) -> bool {
        self.excluded_participant_ids.contains(participant)
    }

    pub fn excludes_anyone(&self) -> bool {
        !self.excluded_participant_ids.is_empty()
    }

    /// Drops rows belonging to outlier participants
    ///
    /// Applying the same threshold again removes nothing further.
    pub fn exclude(&self, mut rows: Vec<EventRecord>) -> Vec<EventRecord> {
        if self.excludes_anyone() {
            rows.retain(|row| !self.is_outlier(&row.participant_id));
        }
        rows
    }
}

/// Repeat-participant summary card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSummary {
    /// Participants with more than one event
    pub repeat_participants: u64,
    /// Share of all events attributed to repeaters, in percent
    pub percent_by_repeaters: RateValue,
    /// Repeaters at or above the cutoff
    pub outlier_participants: u64,
    pub threshold: Option<f64>,
}

/// Computes repeat counts and thresholds from the event store
#[derive(Clone)]
pub struct OutlierDetector {
    aggregator: EventAggregator,
}

impl OutlierDetector {
    pub fn new(aggregator: EventAggregator) -> Self {
        Self { aggregator }
    }

    /// Per-participant counts of `category` events in the raw `range`
    pub async fn repeat_offenders(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
    ) -> Result<RepeatCounts> {
        let query = EventQuery::new(
            category.visit_source(),
            category.default_date_field(),
            *range,
        )
        .with_org(org.clone());
        let rows = self.aggregator.fetch(category, &query).await?;
        Ok(RepeatCounts::from_rows(&rows))
    }

    /// Outlier threshold for `category`, computed once per call chain
    pub async fn threshold(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
    ) -> Result<OutlierThreshold> {
        let counts = self.repeat_offenders(category, org, range).await?;
        let threshold = OutlierThreshold::from_counts(&counts);
        if threshold.threshold.is_none() {
            log_degenerate_threshold!(category, counts.repeaters.len());
        } else {
            tracing::debug!(
                category = %category,
                threshold = ?threshold.threshold,
                excluded = threshold.excluded_participant_ids.len(),
                "Computed outlier threshold"
            );
        }
        Ok(threshold)
    }

    pub async fn summary(
        &self,
        category: EventCategory,
        org: &OrgFilter,
        range: &DateRange,
        normalizer: &RateNormalizer,
    ) -> Result<OutlierSummary> {
        let counts = self.repeat_offenders(category, org, range).await?;
        let threshold = OutlierThreshold::from_counts(&counts);
        if threshold.threshold.is_none() {
            log_degenerate_threshold!(category, counts.repeaters.len());
        }

        Ok(OutlierSummary {
            repeat_participants: counts.repeaters.len() as u64,
            percent_by_repeaters: normalizer
                .percent(counts.repeat_events() as f64, counts.total_events as f64),
            outlier_participants: threshold.excluded_participant_ids.len() as u64,
            threshold: threshold.threshold,
        })
    }
}
