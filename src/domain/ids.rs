//! Domain identifier types with validation
//!
//! Newtype wrappers for participant, organizational unit and column
//! identifiers. Each type keeps different identifiers from being mixed up
//! and validates its format once, at construction.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Participant identifier newtype wrapper
///
/// Identifies an enrolled member. Event and enrollment rows are joined on it.
///
/// # Examples
///
/// ```
/// use pacemetrics::domain::ids::ParticipantId;
/// use std::str::FromStr;
///
/// let id = ParticipantId::from_str("1042").unwrap();
/// assert_eq!(id.as_str(), "1042");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a new ParticipantId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(ParticipantId)` if the ID is non-empty, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Participant ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the participant ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Organizational unit (center) newtype wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrgUnit(String);

impl OrgUnit {
    /// Creates a new OrgUnit from a string
    pub fn new(unit: impl Into<String>) -> Result<Self, String> {
        let unit = unit.into();
        if unit.trim().is_empty() {
            return Err("Organizational unit cannot be empty".to_string());
        }
        Ok(Self(unit))
    }

    /// Returns the unit name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OrgUnit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrgUnit> for String {
    fn from(unit: OrgUnit) -> Self {
        unit.0
    }
}

/// Organizational filter applied to every read
///
/// `"all"` (any case) disables the filter; anything else selects one unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum OrgFilter {
    /// Every organizational unit
    #[default]
    All,
    /// A single organizational unit
    Unit(OrgUnit),
}

impl OrgFilter {
    /// Whether a row belonging to `unit` passes the filter
    pub fn admits(&self, unit: Option<&OrgUnit>) -> bool {
        match self {
            OrgFilter::All => true,
            OrgFilter::Unit(wanted) => unit == Some(wanted),
        }
    }

    /// Returns the selected unit, if any
    pub fn unit(&self) -> Option<&OrgUnit> {
        match self {
            OrgFilter::All => None,
            OrgFilter::Unit(unit) => Some(unit),
        }
    }
}

impl fmt::Display for OrgFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrgFilter::All => write!(f, "all"),
            OrgFilter::Unit(unit) => write!(f, "{unit}"),
        }
    }
}

impl FromStr for OrgFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(OrgFilter::All);
        }
        OrgUnit::new(s.trim()).map(OrgFilter::Unit)
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"))
}

/// Name of a categorical event column
///
/// Restricted to plain SQL identifiers (letters, digits, underscores) so
/// query renderers can quote it without escaping.
///
/// # Examples
///
/// ```
/// use pacemetrics::domain::ids::AttributeName;
///
/// assert!(AttributeName::new("discharge_dx").is_ok());
/// assert!(AttributeName::new("dx; DROP TABLE x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeName(String);

impl AttributeName {
    /// Creates a new AttributeName, rejecting anything that is not a plain identifier
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if !identifier_pattern().is_match(&name) {
            return Err(format!(
                "Invalid column name '{name}'. Expected letters, digits and underscores"
            ));
        }
        Ok(Self(name))
    }

    /// Returns the column name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttributeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AttributeName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AttributeName> for String {
    fn from(name: AttributeName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_valid() {
        let id = ParticipantId::new("1001").unwrap();
        assert_eq!(id.as_str(), "1001");
        assert_eq!(id.to_string(), "1001");
    }

    #[test]
    fn test_participant_id_empty() {
        assert!(ParticipantId::new("").is_err());
        assert!(ParticipantId::new("   ").is_err());
    }

    #[test]
    fn test_participant_id_serde_roundtrip() {
        let id = ParticipantId::new("77").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"77\"");
        assert!(serde_json::from_str::<ParticipantId>("\"\"").is_err());
    }

    #[test]
    fn test_org_filter_parse() {
        assert_eq!(OrgFilter::from_str("all").unwrap(), OrgFilter::All);
        assert_eq!(OrgFilter::from_str("ALL").unwrap(), OrgFilter::All);
        let filter = OrgFilter::from_str("Woonsocket").unwrap();
        assert_eq!(filter.unit().map(OrgUnit::as_str), Some("Woonsocket"));
        assert!(OrgFilter::from_str("").is_err());
    }

    #[test]
    fn test_org_filter_admits() {
        let unit = OrgUnit::new("Providence").unwrap();
        let other = OrgUnit::new("Westerly").unwrap();
        let filter = OrgFilter::Unit(unit.clone());

        assert!(filter.admits(Some(&unit)));
        assert!(!filter.admits(Some(&other)));
        assert!(!filter.admits(None));
        assert!(OrgFilter::All.admits(None));
    }

    #[test]
    fn test_attribute_name_validation() {
        assert!(AttributeName::new("facility").is_ok());
        assert!(AttributeName::new("_private").is_ok());
        assert!(AttributeName::new("days_MD").is_ok());
        assert!(AttributeName::new("dx-code").is_err());
        assert!(AttributeName::new("1col").is_err());
        assert!(AttributeName::new("a b").is_err());
        assert!(AttributeName::new("").is_err());
    }
}
