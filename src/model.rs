use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which mock catalog the classifier draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Wildlife,
    Livestock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub max_upload_bytes: u64,
    #[serde(with = "humantime_serde")]
    pub classify_timeout: Duration,
    pub catalog: CatalogKind,
    #[serde(with = "humantime_serde")]
    pub min_latency: Duration,
    #[serde(with = "humantime_serde")]
    pub max_latency: Duration,
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    pub user_agent: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: crate::validate::MAX_UPLOAD_BYTES,
            classify_timeout: Duration::from_secs(15),
            catalog: CatalogKind::Wildlife,
            min_latency: Duration::from_millis(2000),
            max_latency: Duration::from_millis(3500),
            backend_url: None,
            seed: None,
            user_agent: format!("fauna-lens/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A file as handed over by the user, before any validation.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Bytes,
}

/// An image accepted by the validator. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSubmission {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Bytes,
}

/// Integer percentage clamped to the inclusive range 0..=100 by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// Clamp `value` into range.
    pub fn saturating(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Percent {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Percent::new(value).ok_or_else(|| format!("{value} is outside 0..=100"))
    }
}

impl From<Percent> for u8 {
    fn from(p: Percent) -> Self {
        p.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type Confidence = Percent;
pub type Score = Percent;

/// Coarse confidence grouping used by presenters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn of(confidence: Confidence) -> Self {
        match confidence.get() {
            90..=u8::MAX => ConfidenceBand::High,
            70..=89 => ConfidenceBand::Medium,
            _ => ConfidenceBand::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::High => "High Confidence",
            ConfidenceBand::Medium => "Medium Confidence",
            ConfidenceBand::Low => "Low Confidence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Calm,
    Aggressive,
}

impl Mood {
    pub const ALL: [Mood; 2] = [Mood::Calm, Mood::Aggressive];
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mood::Calm => f.write_str("Calm"),
            Mood::Aggressive => f.write_str("Aggressive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivestockTraits {
    pub body_size: Score,
    pub posture: Score,
    pub symmetry: Score,
}

/// Per-domain payload of a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectProfile {
    Wildlife {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mood: Option<Mood>,
    },
    Livestock {
        body_structure_score: Score,
        traits: LivestockTraits,
    },
}

/// Supporting facts shown next to the classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub description: String,
    /// Natural habitat for wildlife, assessment context for livestock.
    pub context: String,
    /// Safety tips or husbandry recommendations, in display order.
    pub guidance: Vec<String>,
    pub highlight_fact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub subject_type: String,
    pub confidence: Confidence,
    pub narrative: Narrative,
    pub profile: SubjectProfile,
}

impl ClassificationResult {
    pub fn mood(&self) -> Option<Mood> {
        match self.profile {
            SubjectProfile::Wildlife { mood } => mood,
            SubjectProfile::Livestock { .. } => None,
        }
    }
}

/// Opaque address of a live preview.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewUri(pub(crate) String);

impl fmt::Display for PreviewUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// Human-readable status record for the notification renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowPhase {
    Idle,
    Analyzing,
    Result,
}

/// What a presenter needs to show the live preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewInfo {
    pub uri: PreviewUri,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl fmt::Display for PreviewInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kib = self.size_bytes as f64 / 1024.0;
        if kib >= 1024.0 {
            write!(f, "{} ({}, {:.1} MiB)", self.uri, self.mime_type, kib / 1024.0)
        } else {
            write!(f, "{} ({}, {:.1} KiB)", self.uri, self.mime_type, kib)
        }
    }
}

/// Read-only view of the workflow handed to presenters after every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    pub file_name: Option<String>,
    pub preview: Option<PreviewInfo>,
    pub result: Option<ClassificationResult>,
}

impl WorkflowSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            file_name: None,
            preview: None,
            result: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Notify(Notification),
    StateChanged(Box<WorkflowSnapshot>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rejects_values_above_hundred() {
        assert_eq!(Percent::new(100).map(Percent::get), Some(100));
        assert!(Percent::new(101).is_none());
        assert!(serde_json::from_str::<Percent>("150").is_err());
        assert_eq!(serde_json::from_str::<Percent>("42").ok(), Percent::new(42));
    }

    #[test]
    fn confidence_band_thresholds() {
        let band = |v| ConfidenceBand::of(Percent::new(v).unwrap());
        assert_eq!(band(99), ConfidenceBand::High);
        assert_eq!(band(90), ConfidenceBand::High);
        assert_eq!(band(89), ConfidenceBand::Medium);
        assert_eq!(band(70), ConfidenceBand::Medium);
        assert_eq!(band(69), ConfidenceBand::Low);
        assert_eq!(band(69).label(), "Low Confidence");
    }

    #[test]
    fn profile_serializes_with_kind_tag() {
        let profile = SubjectProfile::Wildlife {
            mood: Some(Mood::Calm),
        };
        let v = serde_json::to_value(&profile).unwrap();
        assert_eq!(v["kind"], "wildlife");
        assert_eq!(v["mood"], "Calm");
    }
}
