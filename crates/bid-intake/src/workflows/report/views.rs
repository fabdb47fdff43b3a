use crate::workflows::classification::Bucket;
use crate::workflows::taxonomy::{CanonicalLine, IntentTarget};
use crate::workflows::units::UnitKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Why a row was surfaced for human review instead of mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedReason {
    UnrecognizedKey,
    UnrecognizedSection,
    NoValue,
    Ambiguous,
    UnsupportedUom,
}

impl UnmappedReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnrecognizedKey => "unrecognized key",
            Self::UnrecognizedSection => "unrecognized section",
            Self::NoValue => "no value",
            Self::Ambiguous => "ambiguous",
            Self::UnsupportedUom => "unsupported unit of measure",
        }
    }
}

/// Why a row was skipped outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredReason {
    BlankKey,
    NonNumericValue,
    MissingValue,
    MalformedRecord,
}

impl IgnoredReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BlankKey => "blank key",
            Self::NonNumericValue => "non-numeric value",
            Self::MissingValue => "missing value",
            Self::MalformedRecord => "malformed record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedField {
    pub row_index: usize,
    pub raw_key: String,
    pub normalized_key: String,
    pub value: f64,
    pub unit_kind: UnitKind,
    pub target: IntentTarget,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<Bucket>,
    pub explanation: String,
}

/// A candidate target offered to the reviewer for an unmapped row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub target: IntentTarget,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedField {
    pub item_key: String,
    pub row_index: usize,
    pub raw_key: String,
    pub normalized_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_guess: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub unit_kind: UnitKind,
    pub reason: UnmappedReason,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_tokens: Vec<String>,
}

impl UnmappedField {
    pub fn top_suggestion(&self) -> Option<&Suggestion> {
        self.suggestions.first()
    }
}

/// QA identity of an unmapped row. The same label can recur on several rows,
/// so the row index is part of the key.
pub fn item_key(section_guess: Option<&str>, normalized_key: &str, row_index: usize) -> String {
    format!(
        "{}|{}|{}",
        section_guess.unwrap_or("unknown"),
        normalized_key,
        row_index
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IgnoredRow {
    pub row_index: usize,
    pub raw_key: String,
    pub reason: IgnoredReason,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingRequirement {
    Anchor { line: CanonicalLine },
    Group {
        name: &'static str,
        members: Vec<CanonicalLine>,
    },
}

impl std::fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anchor { line } => write!(f, "{line}"),
            Self::Group { name, .. } => write!(f, "at least one {name} line"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub parsed_rows: usize,
    pub mapped_rows: usize,
    pub unmapped_rows: usize,
    pub ignored_rows: usize,
    pub confidence: ConfidenceTier,
}

/// Summed quantity for one (section, label) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityLine {
    pub section: String,
    pub label: String,
    pub quantity: f64,
    pub source_rows: usize,
}
