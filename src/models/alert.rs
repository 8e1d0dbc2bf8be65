use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Number of alert classes the classifier is trained on
pub const N_CLASSES: usize = 4;

/// Alert classes addressed by their encoded class index.
///
/// The training label encoding is `green:0, orange:1, red:2, yellow:3`. It is
/// not ordered by severity and every persisted model depends on it, so it
/// must never be reordered.
const ENCODED_CLASSES: [AlertClass; N_CLASSES] = [
    AlertClass::Low,
    AlertClass::High,
    AlertClass::Critical,
    AlertClass::Moderate,
];

/// Earthquake impact alert level.
///
/// Variants are declared in severity order, so the derived `Ord` gives
/// `Low < Moderate < High < Critical`. The canonical textual form is the
/// colour code used by the source dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum AlertClass {
    #[serde(rename = "green")]
    #[strum(to_string = "green", serialize = "low")]
    Low,

    #[serde(rename = "yellow")]
    #[strum(to_string = "yellow", serialize = "moderate")]
    Moderate,

    #[serde(rename = "orange")]
    #[strum(to_string = "orange", serialize = "high")]
    High,

    #[serde(rename = "red")]
    #[strum(to_string = "red", serialize = "critical")]
    Critical,
}

impl AlertClass {
    /// Canonical colour code (`green`, `yellow`, `orange`, `red`)
    pub fn code(&self) -> &'static str {
        match self {
            AlertClass::Low => "green",
            AlertClass::Moderate => "yellow",
            AlertClass::High => "orange",
            AlertClass::Critical => "red",
        }
    }

    /// Class index under the training label encoding
    pub fn encoded(&self) -> usize {
        match self {
            AlertClass::Low => 0,
            AlertClass::High => 1,
            AlertClass::Critical => 2,
            AlertClass::Moderate => 3,
        }
    }

    /// Inverse of [`AlertClass::encoded`]
    pub fn from_encoded(index: usize) -> Option<Self> {
        ENCODED_CLASSES.get(index).copied()
    }

    /// Parse a dataset label, tolerating surrounding whitespace and any casing
    pub fn parse_label(label: &str) -> Option<Self> {
        AlertClass::from_str(label.trim()).ok()
    }

    /// Bucket a rule-based risk score into an alert class
    pub fn from_risk(risk: f64) -> Self {
        if risk < 3.5 {
            AlertClass::Low
        } else if risk < 5.5 {
            AlertClass::Moderate
        } else if risk < 7.5 {
            AlertClass::High
        } else {
            AlertClass::Critical
        }
    }

    /// Static display metadata for this class
    pub fn info(&self) -> AlertInfo {
        let (level, description) = match self {
            AlertClass::Low => ("LOW IMPACT", "Minimal damage expected"),
            AlertClass::Moderate => ("MODERATE IMPACT", "Some damage possible"),
            AlertClass::High => ("HIGH IMPACT", "Significant damage expected"),
            AlertClass::Critical => ("CRITICAL IMPACT", "Severe damage expected"),
        };

        AlertInfo {
            code: self.code().to_string(),
            level: level.to_string(),
            description: description.to_string(),
        }
    }

    /// Recommended actions for this class
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            AlertClass::Low => &[
                "Monitor official channels",
                "Review emergency plans",
                "Secure loose items",
                "Ensure communication devices are charged",
            ],
            AlertClass::Moderate => &[
                "Finalize evacuation routes",
                "Alert family members",
                "Prepare emergency kit",
                "Listen to emergency broadcasts",
            ],
            AlertClass::High => &[
                "Follow evacuation orders",
                "Avoid damaged structures",
                "Move to designated safe zones",
                "Check on neighbors if safe",
            ],
            AlertClass::Critical => &[
                "Follow all emergency instructions immediately",
                "Stay calm and assist others if possible",
                "Seek shelter in safe location",
                "Use emergency services only for life-threatening situations",
            ],
        }
    }

    /// All classes in severity order
    pub fn all() -> Vec<AlertClass> {
        AlertClass::iter().collect()
    }
}

/// Display metadata attached to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertInfo {
    /// Colour code
    pub code: String,

    /// Display label, e.g. "HIGH IMPACT"
    pub level: String,

    /// Severity description
    pub description: String,
}

/// Raw classifier output as first observed at the model boundary
#[derive(Debug, Clone, PartialEq)]
pub enum RawClass {
    /// Encoded class index
    Index(i64),

    /// Floating class value, rounded to the nearest index
    Float(f64),

    /// Textual label
    Label(String),
}

impl RawClass {
    /// Normalize to an alert class. `None` means the output is outside the
    /// known encoding and the caller must fall back.
    pub fn decode(&self) -> Option<AlertClass> {
        match self {
            RawClass::Index(index) => usize::try_from(*index)
                .ok()
                .and_then(AlertClass::from_encoded),
            RawClass::Float(value) => {
                if !value.is_finite() {
                    return None;
                }
                RawClass::Index(value.round() as i64).decode()
            }
            RawClass::Label(label) => AlertClass::parse_label(label),
        }
    }
}

impl From<usize> for RawClass {
    fn from(index: usize) -> Self {
        RawClass::Index(index as i64)
    }
}
