//! Enrollment interval model
//!
//! Enrollment rows are the source of truth for the census denominator.
//! The engine only ever reads them.

use super::ids::{OrgUnit, ParticipantId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One participant's enrollment span
///
/// `disenrollment_date = None` means the participant is still enrolled.
///
/// # Examples
///
/// ```
/// use pacemetrics::domain::EnrollmentInterval;
/// use chrono::NaiveDate;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
/// let interval = EnrollmentInterval::new("1001", None, d(1, 1), Some(d(6, 30))).unwrap();
///
/// assert!(interval.is_enrolled_on(d(6, 30)));
/// assert!(!interval.is_enrolled_on(d(7, 1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnrollment")]
pub struct EnrollmentInterval {
    participant_id: ParticipantId,
    organizational_unit: Option<OrgUnit>,
    enrollment_date: NaiveDate,
    disenrollment_date: Option<NaiveDate>,
}

impl EnrollmentInterval {
    /// Creates a validated enrollment interval
    ///
    /// # Errors
    ///
    /// Returns an error if the participant ID is empty or the
    /// disenrollment date precedes the enrollment date.
    pub fn new(
        participant_id: impl Into<String>,
        organizational_unit: Option<OrgUnit>,
        enrollment_date: NaiveDate,
        disenrollment_date: Option<NaiveDate>,
    ) -> Result<Self, String> {
        let participant_id = ParticipantId::new(participant_id)?;
        if let Some(disenrolled) = disenrollment_date {
            if disenrolled < enrollment_date {
                return Err(format!(
                    "Participant {participant_id}: disenrollment date {disenrolled} precedes enrollment date {enrollment_date}"
                ));
            }
        }
        Ok(Self {
            participant_id,
            organizational_unit,
            enrollment_date,
            disenrollment_date,
        })
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn organizational_unit(&self) -> Option<&OrgUnit> {
        self.organizational_unit.as_ref()
    }

    pub fn enrollment_date(&self) -> NaiveDate {
        self.enrollment_date
    }

    pub fn disenrollment_date(&self) -> Option<NaiveDate> {
        self.disenrollment_date
    }

    /// Point-in-time membership: enrolled on or before `date` and not
    /// disenrolled before it
    pub fn is_enrolled_on(&self, date: NaiveDate) -> bool {
        self.enrollment_date <= date && self.disenrollment_date.map_or(true, |d| d >= date)
    }

    /// Membership on any day of `[start, end]`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.enrollment_date <= end && self.disenrollment_date.map_or(true, |d| d >= start)
    }
}

#[derive(Deserialize)]
struct RawEnrollment {
    participant_id: String,
    #[serde(default)]
    organizational_unit: Option<OrgUnit>,
    enrollment_date: NaiveDate,
    #[serde(default)]
    disenrollment_date: Option<NaiveDate>,
}

impl TryFrom<RawEnrollment> for EnrollmentInterval {
    type Error = String;

    fn try_from(raw: RawEnrollment) -> Result<Self, Self::Error> {
        Self::new(
            raw.participant_id,
            raw.organizational_unit,
            raw.enrollment_date,
            raw.disenrollment_date,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, day).unwrap()
    }

    #[test]
    fn test_rejects_inverted_interval() {
        let result = EnrollmentInterval::new("1", None, d(5, 1), Some(d(4, 30)));
        assert!(result.is_err());
    }

    #[test]
    fn test_same_day_interval_is_valid() {
        let interval = EnrollmentInterval::new("1", None, d(5, 1), Some(d(5, 1))).unwrap();
        assert!(interval.is_enrolled_on(d(5, 1)));
        assert!(!interval.is_enrolled_on(d(5, 2)));
    }

    #[test]
    fn test_open_interval() {
        let interval = EnrollmentInterval::new("1", None, d(3, 15), None).unwrap();
        assert!(!interval.is_enrolled_on(d(3, 1)));
        assert!(interval.is_enrolled_on(d(12, 31)));
    }

    #[test]
    fn test_overlaps() {
        let interval = EnrollmentInterval::new("1", None, d(3, 15), Some(d(4, 10))).unwrap();
        assert!(interval.overlaps(d(1, 1), d(3, 31)));
        assert!(interval.overlaps(d(4, 1), d(6, 30)));
        assert!(!interval.overlaps(d(4, 11), d(6, 30)));
        assert!(!interval.overlaps(d(1, 1), d(3, 14)));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"participant_id":"9","enrollment_date":"2023-01-01"}"#;
        let interval: EnrollmentInterval = serde_json::from_str(ok).unwrap();
        assert!(interval.disenrollment_date().is_none());

        let bad = r#"{"participant_id":"9","enrollment_date":"2023-02-01","disenrollment_date":"2023-01-01"}"#;
        assert!(serde_json::from_str::<EnrollmentInterval>(bad).is_err());
    }
}
