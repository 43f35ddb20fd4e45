//! Category ordering and series styling
//!
//! Series order comes from an unfiltered baseline so that changing the
//! secondary filter never reshuffles legends. Colours are assigned by
//! position in that order from the configured palette.

use crate::config::PaletteConfig;
use crate::core::aggregate::{CountMatrix, Matrix};
use crate::domain::AnalyticsError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Series names by descending total, ties broken by name
///
/// # Examples
///
/// ```
/// use pacemetrics::core::aggregate::{Matrix, Series};
/// use pacemetrics::core::ordering::stable_order;
/// use pacemetrics::core::period::BucketKey;
///
/// let baseline = Matrix::from_series(
///     vec![BucketKey::Month { year: 2023, month: 1 }],
///     vec![
///         Series::new("Friday", vec![2_u64]),
///         Series::new("Monday", vec![7]),
///         Series::new("Sunday", vec![2]),
///     ],
/// );
/// assert_eq!(stable_order(&baseline), vec!["Monday", "Friday", "Sunday"]);
/// ```
pub fn stable_order(baseline: &CountMatrix) -> Vec<String> {
    let mut totals = baseline.series_totals();
    totals.sort_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)));
    totals.into_iter().map(|(name, _)| name).collect()
}

/// How many series to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TopN {
    Five,
    Ten,
    #[default]
    All,
}

impl TopN {
    pub fn limit(&self) -> Option<usize> {
        match self {
            TopN::Five => Some(5),
            TopN::Ten => Some(10),
            TopN::All => None,
        }
    }
}

impl fmt::Display for TopN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit() {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("all"),
        }
    }
}

impl FromStr for TopN {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5" | "five" => Ok(TopN::Five),
            "10" | "ten" => Ok(TopN::Ten),
            "all" => Ok(TopN::All),
            other => Err(AnalyticsError::Validation(format!(
                "Unknown top-n '{other}'. Expected 5, 10 or all"
            ))),
        }
    }
}

/// Baseline order restricted to the series actually present, truncated
///
/// Present series missing from the baseline go last, by name.
pub fn display_order(baseline_order: &[String], present: &[String], top_n: TopN) -> Vec<String> {
    let mut order: Vec<String> = baseline_order
        .iter()
        .filter(|name| present.contains(name))
        .cloned()
        .collect();

    let mut unranked: Vec<String> = present
        .iter()
        .filter(|name| !baseline_order.contains(name))
        .cloned()
        .collect();
    unranked.sort();
    order.extend(unranked);

    if let Some(limit) = top_n.limit() {
        order.truncate(limit);
    }
    order
}

/// Reorders and truncates `matrix` to `order`
pub fn apply_order<T>(matrix: Matrix<T>, order: &[String]) -> Matrix<T> {
    matrix.reorder(order)
}

/// A series name paired with its colour
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesStyle {
    pub name: String,
    pub color: String,
}

/// Ordered colour palette; colours repeat once exhausted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPalette {
    colors: Vec<String>,
}

impl SeriesPalette {
    pub fn new(colors: Vec<String>) -> Self {
        Self { colors }
    }

    pub fn color(&self, index: usize) -> Option<&str> {
        if self.colors.is_empty() {
            None
        } else {
            Some(self.colors[index % self.colors.len()].as_str())
        }
    }

    pub fn styles(&self, order: &[String]) -> Vec<SeriesStyle> {
        order
            .iter()
            .enumerate()
            .map(|(i, name)| SeriesStyle {
                name: name.clone(),
                color: self.color(i).unwrap_or_default().to_string(),
            })
            .collect()
    }
}

impl Default for SeriesPalette {
    fn default() -> Self {
        Self::from(&PaletteConfig::default())
    }
}

impl From<&PaletteConfig> for SeriesPalette {
    fn from(config: &PaletteConfig) -> Self {
        Self::new(config.colors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::Series;
    use crate::core::period::BucketKey;
    use test_case::test_case;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test_case("5", TopN::Five ; "five")]
    #[test_case("10", TopN::Ten ; "ten")]
    #[test_case("ALL", TopN::All ; "all")]
    fn test_parse_top_n(input: &str, expected: TopN) {
        assert_eq!(input.parse::<TopN>().unwrap(), expected);
    }

    #[test]
    fn test_parse_top_n_rejects_other_values() {
        assert!("3".parse::<TopN>().is_err());
    }

    #[test]
    fn test_display_order_intersects_and_truncates() {
        let baseline = names(&["a", "b", "c", "d", "e", "f"]);
        let present = names(&["f", "c", "a", "z"]);
        assert_eq!(display_order(&baseline, &present, TopN::All), names(&["a", "c", "f", "z"]));

        let many = names(&["a", "b", "c", "d", "e", "f"]);
        assert_eq!(display_order(&baseline, &many, TopN::Five).len(), 5);
    }

    #[test]
    fn test_order_ignores_filtered_counts() {
        let keys = vec![BucketKey::Month { year: 2023, month: 1 }];
        let baseline = Matrix::from_series(
            keys.clone(),
            vec![Series::new("x", vec![9_u64]), Series::new("y", vec![4])],
        );
        // A secondary filter flips the volumes but not the baseline order
        let filtered = Matrix::from_series(keys, vec![Series::new("x", vec![1_u64]), Series::new("y", vec![3])]);

        let order = stable_order(&baseline);
        let shown = display_order(&order, &filtered.series_names(), TopN::All);
        assert_eq!(apply_order(filtered, &shown).series_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_palette_wraps() {
        let palette = SeriesPalette::new(names(&["#000000", "#ffffff"]));
        let styles = palette.styles(&names(&["a", "b", "c"]));
        assert_eq!(styles[2].color, "#000000");
        assert_eq!(SeriesPalette::new(Vec::new()).color(0), None);
    }
}
