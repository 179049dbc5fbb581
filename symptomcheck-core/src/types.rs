use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymptomError {
    #[error("symptom name must not be empty")]
    EmptyName,

    #[error("severity {0} is outside 1..=10")]
    SeverityOutOfRange(i64),
}

/// Symptom severity on a 1..=10 scale.
///
/// Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub fn new(value: i64) -> Result<Self, SymptomError> {
        if (MIN_SEVERITY as i64..=MAX_SEVERITY as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(SymptomError::SeverityOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Severity {
    type Error = SymptomError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SymptomRecordWire")]
pub struct SymptomRecord {
    pub name: String,
    pub severity: Severity,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Decoding goes through this shape so the name invariant is checked too.
#[derive(Deserialize)]
struct SymptomRecordWire {
    name: String,
    severity: Severity,
    duration: String,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<SymptomRecordWire> for SymptomRecord {
    type Error = SymptomError;

    fn try_from(wire: SymptomRecordWire) -> Result<Self, Self::Error> {
        SymptomRecord::new(wire.name, wire.severity, wire.duration, wire.description)
    }
}

impl SymptomRecord {
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        duration: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, SymptomError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SymptomError::EmptyName);
        }

        Ok(Self {
            name,
            severity,
            duration: duration.into(),
            description: description.filter(|d| !d.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl UrgencyLevel {
    pub const ALL: [UrgencyLevel; 4] = [
        UrgencyLevel::Low,
        UrgencyLevel::Medium,
        UrgencyLevel::High,
        UrgencyLevel::Emergency,
    ];

    pub fn label(self) -> &'static str {
        match self {
            UrgencyLevel::Low => "Low",
            UrgencyLevel::Medium => "Medium",
            UrgencyLevel::High => "High",
            UrgencyLevel::Emergency => "Emergency",
        }
    }

    /// Wait-time guidance for the tier, as embedded in the diagnosis prompt.
    pub fn guidance(self) -> &'static str {
        match self {
            UrgencyLevel::Low => "Can wait for a routine appointment; self-care is usually enough",
            UrgencyLevel::Medium => "See a doctor within the next few days",
            UrgencyLevel::High => "Seek medical care within 24 hours",
            UrgencyLevel::Emergency => "Seek immediate emergency care or call emergency services",
        }
    }
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub possible_conditions: Vec<String>,
    pub recommended_actions: String,
    pub urgency_level: UrgencyLevel,
    pub additional_notes: String,
    pub timestamp_unix_ms: i64,
}

pub fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headache() -> SymptomRecord {
        SymptomRecord::new(
            "Headache",
            Severity::new(7).unwrap(),
            "2 days",
            Some("Throbbing behind the eyes".into()),
        )
        .unwrap()
    }

    #[test]
    fn severity_rejects_out_of_range() {
        assert_eq!(Severity::new(0), Err(SymptomError::SeverityOutOfRange(0)));
        assert_eq!(Severity::new(11), Err(SymptomError::SeverityOutOfRange(11)));
        assert_eq!(Severity::new(-3), Err(SymptomError::SeverityOutOfRange(-3)));
        assert_eq!(Severity::new(1).unwrap().get(), 1);
        assert_eq!(Severity::new(10).unwrap().get(), 10);
    }

    #[test]
    fn symptom_requires_non_blank_name() {
        let err = SymptomRecord::new("   ", Severity::new(3).unwrap(), "1 day", None);
        assert_eq!(err, Err(SymptomError::EmptyName));
    }

    #[test]
    fn blank_description_is_dropped() {
        let s = SymptomRecord::new("Cough", Severity::new(2).unwrap(), "a week", Some("  ".into()))
            .unwrap();
        assert_eq!(s.description, None);
    }

    #[test]
    fn symptom_json_round_trip_preserves_fields() {
        let s = headache();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"severity\":7"));
        let back: SymptomRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);

        let no_desc = SymptomRecord::new("Fever", Severity::new(5).unwrap(), "1 day", None).unwrap();
        let json = serde_json::to_string(&no_desc).unwrap();
        assert!(!json.contains("description"));
        let back: SymptomRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, no_desc);
    }

    #[test]
    fn decoding_checks_invariants() {
        let bad_severity = r#"{"name":"Fever","severity":12,"duration":"1 day"}"#;
        assert!(serde_json::from_str::<SymptomRecord>(bad_severity).is_err());

        let blank_name = r#"{"name":" ","severity":4,"duration":"1 day"}"#;
        assert!(serde_json::from_str::<SymptomRecord>(blank_name).is_err());

        let missing_duration = r#"{"name":"Fever","severity":4}"#;
        assert!(serde_json::from_str::<SymptomRecord>(missing_duration).is_err());
    }

    #[test]
    fn urgency_defaults_to_medium() {
        assert_eq!(UrgencyLevel::default(), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::Emergency.to_string(), "Emergency");
    }
}
