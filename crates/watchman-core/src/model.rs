//! Shared surveillance types: roster entries, log entries, and the transient
//! judgement returned by the classification service.
//!
//! Field names serialize in camelCase so persisted state stays readable by
//! any dashboard that shares the same storage keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of an authorized person, embedded verbatim into the classification prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Teacher => "Teacher",
            Self::Staff => "Staff",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person on the roster.
///
/// Identity is `id`. Entries are created and removed, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedPerson {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl AuthorizedPerson {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            image_url: None,
        }
    }

    /// Prompt form: `"Emily Chen (Student)"`.
    pub fn prompt_label(&self) -> String {
        format!("{} ({})", self.name, self.role)
    }
}

/// Status recorded on a log entry.
///
/// The capture loop only ever writes `Authorized` or `Unauthorized`; the other
/// two exist for entries written by other tooling sharing the same log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogStatus {
    Authorized,
    Unauthorized,
    Warning,
    Info,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "Authorized",
            Self::Unauthorized => "Unauthorized",
            Self::Warning => "Warning",
            Self::Info => "Info",
        }
    }
}

impl From<AnalysisStatus> for LogStatus {
    /// Anything the service did not positively authorize is logged as `Unauthorized`.
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Authorized => Self::Authorized,
            AnalysisStatus::Unauthorized | AnalysisStatus::None => Self::Unauthorized,
        }
    }
}

/// One surveillance event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveillanceLog {
    pub id: String,
    /// Local wall-clock time, already formatted for display.
    pub timestamp: String,
    pub event: String,
    pub status: LogStatus,
    pub detected_name: String,
}

impl SurveillanceLog {
    /// Build the log entry for a detection.
    ///
    /// Returns `None` when the result did not detect a subject: non-detections
    /// never reach the log.
    pub fn from_detection(
        result: &AnalysisResult,
        id: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Option<Self> {
        if !result.detected {
            return None;
        }
        Some(Self {
            id: id.into(),
            timestamp: timestamp.into(),
            event: format!("Detection: {}", result.name),
            status: result.status.into(),
            detected_name: result.name.clone(),
        })
    }
}

/// Security status in a service judgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Authorized,
    Unauthorized,
    None,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "Authorized",
            Self::Unauthorized => "Unauthorized",
            Self::None => "None",
        }
    }
}

/// Structured judgement for a single frame.
///
/// Deserialization is strict: all four fields are required and unknown fields
/// are rejected, so any drift in the service's output shape is a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisResult {
    pub detected: bool,
    pub name: String,
    pub status: AnalysisStatus,
    pub reason: String,
}

impl AnalysisResult {
    /// Sentinel returned whenever classification fails for any reason.
    pub fn fallback() -> Self {
        Self {
            detected: false,
            name: "Error".to_string(),
            status: AnalysisStatus::None,
            reason: "Could not process image.".to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }
}

/// A still image captured from the live video source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// JPEG-encoded image bytes.
    pub jpeg: Vec<u8>,
    /// Dimensions requested from the device, not decoded from `jpeg`.
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(jpeg: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            jpeg,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(name: &str, status: AnalysisStatus) -> AnalysisResult {
        AnalysisResult {
            detected: true,
            name: name.into(),
            status,
            reason: "matched".into(),
        }
    }

    #[test]
    fn authorized_detection_becomes_authorized_log() {
        let log = SurveillanceLog::from_detection(
            &detection("Ann", AnalysisStatus::Authorized),
            "42",
            "10:15:00",
        )
        .unwrap();
        assert_eq!(log.status, LogStatus::Authorized);
        assert_eq!(log.event, "Detection: Ann");
        assert_eq!(log.detected_name, "Ann");
        assert_eq!(log.id, "42");
    }

    #[test]
    fn unmatched_detection_is_logged_unauthorized() {
        for status in [AnalysisStatus::Unauthorized, AnalysisStatus::None] {
            let log =
                SurveillanceLog::from_detection(&detection("Unknown", status), "1", "t").unwrap();
            assert_eq!(log.status, LogStatus::Unauthorized);
        }
    }

    #[test]
    fn non_detection_produces_no_log() {
        assert!(SurveillanceLog::from_detection(&AnalysisResult::fallback(), "1", "t").is_none());
    }

    #[test]
    fn person_serializes_camel_case() {
        let mut person = AuthorizedPerson::new("7", "Ann", Role::Teacher);
        let json = serde_json::to_string(&person).unwrap();
        assert_eq!(json, r#"{"id":"7","name":"Ann","role":"Teacher"}"#);

        person.image_url = Some("https://example.test/ann.png".into());
        let json = serde_json::to_string(&person).unwrap();
        assert!(json.contains(r#""imageUrl":"https://example.test/ann.png""#));
    }

    #[test]
    fn log_serializes_detected_name() {
        let log = SurveillanceLog {
            id: "1".into(),
            timestamp: "09:00:00".into(),
            event: "Detection: Ann".into(),
            status: LogStatus::Authorized,
            detected_name: "Ann".into(),
        };
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains(r#""detectedName":"Ann""#));
        assert!(json.contains(r#""status":"Authorized""#));
    }

    #[test]
    fn analysis_result_rejects_missing_field() {
        let json = r#"{"detected": true, "name": "Ann", "status": "Authorized"}"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn analysis_result_rejects_unknown_status() {
        let json = r#"{"detected": true, "name": "Ann", "status": "Maybe", "reason": "x"}"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn analysis_result_rejects_extra_field() {
        let json = r#"{"detected": false, "name": "", "status": "None", "reason": "", "score": 1}"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn fallback_shape() {
        let fb = AnalysisResult::fallback();
        assert!(!fb.detected);
        assert_eq!(fb.name, "Error");
        assert_eq!(fb.status, AnalysisStatus::None);
        assert_eq!(fb.reason, "Could not process image.");
        assert!(fb.is_fallback());
    }

    #[test]
    fn prompt_label_format() {
        let p = AuthorizedPerson::new("1", "Dr. Sarah Wilson", Role::Teacher);
        assert_eq!(p.prompt_label(), "Dr. Sarah Wilson (Teacher)");
    }
}
