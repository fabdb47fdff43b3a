//! Canonical bid taxonomy: the fixed (section, label) leaves every field
//! resolves onto, plus the anchor requirements that drive report confidence.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNITS: &str = "Units";
pub const CORRIDORS: &str = "Corridors";
pub const STAIRS: &str = "Stairs";
pub const EXTERIOR: &str = "Exterior";
pub const BALCONIES: &str = "Balconies";
pub const GARAGE: &str = "Garage";
pub const AMENITY: &str = "Amenity";
pub const SITE: &str = "Site";

/// Every bid line the destination form knows about.
pub const BID_LINES: &[(&str, &[&str])] = &[
    (UNITS, &["Wall SF", "Ceiling SF", "Doors", "Base LF", "Count"]),
    (CORRIDORS, &["Wall SF", "Ceiling SF", "Doors", "Base LF"]),
    (STAIRS, &["Levels", "Wall SF", "Railing LF"]),
    (
        EXTERIOR,
        &["Siding SF", "Trim LF", "Doors", "CMU SF", "Soffit SF"],
    ),
    (BALCONIES, &["Count", "Railing LF", "Ceiling SF"]),
    (GARAGE, &["Wall SF", "Ceiling SF", "Doors"]),
    (AMENITY, &["Wall SF", "Ceiling SF"]),
    (SITE, &["Fence LF", "Bollards"]),
];

/// Optional alternate lines priced separately from the base bid.
pub const ALTERNATE_LINES: &[(&str, &[&str])] = &[
    (UNITS, &["Accent Wall SF"]),
    (EXTERIOR, &["Elastomeric Coating SF"]),
];

/// Extra spellings a spreadsheet section header may use, in normalized form.
const SECTION_ALIASES: &[(&str, &str)] = &[
    ("unit", UNITS),
    ("interior", UNITS),
    ("corridor", CORRIDORS),
    ("common area", CORRIDORS),
    ("stair", STAIRS),
    ("exterior", EXTERIOR),
    ("balcony", BALCONIES),
    ("garage", GARAGE),
    ("parking", GARAGE),
    ("amenity", AMENITY),
    ("site", SITE),
    ("sitework", SITE),
];

/// A canonical leaf of the destination taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentTarget {
    BidLine {
        section: String,
        line_label: String,
    },
    AlternateLine {
        section: String,
        line_label: String,
    },
    CreateLine {
        suggested_section: String,
        suggested_label: String,
    },
}

impl IntentTarget {
    pub fn bid_line(section: &str, line_label: &str) -> Self {
        Self::BidLine {
            section: section.to_string(),
            line_label: line_label.to_string(),
        }
    }

    pub fn alternate_line(section: &str, line_label: &str) -> Self {
        Self::AlternateLine {
            section: section.to_string(),
            line_label: line_label.to_string(),
        }
    }

    pub fn create_line(section: &str, label: &str) -> Self {
        Self::CreateLine {
            suggested_section: section.to_string(),
            suggested_label: label.to_string(),
        }
    }

    pub fn section(&self) -> &str {
        match self {
            Self::BidLine { section, .. } | Self::AlternateLine { section, .. } => section,
            Self::CreateLine {
                suggested_section, ..
            } => suggested_section,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::BidLine { line_label, .. } | Self::AlternateLine { line_label, .. } => {
                line_label
            }
            Self::CreateLine {
                suggested_label, ..
            } => suggested_label,
        }
    }

    /// True when the target names a line that already exists on the form.
    pub fn is_existing_line(&self) -> bool {
        !matches!(self, Self::CreateLine { .. })
    }

    /// Whether the target is a known leaf of the taxonomy. Create-line
    /// suggestions are never known by definition.
    pub fn is_known(&self) -> bool {
        match self {
            Self::BidLine {
                section,
                line_label,
            } => contains(BID_LINES, section, line_label),
            Self::AlternateLine {
                section,
                line_label,
            } => contains(ALTERNATE_LINES, section, line_label),
            Self::CreateLine { .. } => false,
        }
    }
}

impl fmt::Display for IntentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BidLine {
                section,
                line_label,
            } => write!(f, "{section} > {line_label}"),
            Self::AlternateLine {
                section,
                line_label,
            } => write!(f, "{section} > {line_label} (alternate)"),
            Self::CreateLine {
                suggested_section,
                suggested_label,
            } => write!(f, "{suggested_section} > {suggested_label} (new line)"),
        }
    }
}

fn contains(table: &[(&str, &[&str])], section: &str, label: &str) -> bool {
    table
        .iter()
        .any(|(known, labels)| *known == section && labels.contains(&label))
}

/// A (section, label) pair of the bid form, used for anchor checks and
/// quantity projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalLine {
    pub section: &'static str,
    pub label: &'static str,
}

impl CanonicalLine {
    pub const fn new(section: &'static str, label: &'static str) -> Self {
        Self { section, label }
    }

    pub fn matches(&self, target: &IntentTarget) -> bool {
        matches!(
            target,
            IntentTarget::BidLine { section, line_label }
                if section == self.section && line_label == self.label
        )
    }
}

impl fmt::Display for CanonicalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {}", self.section, self.label)
    }
}

/// A set of lines of which at least one must be present.
#[derive(Debug, Clone, Copy)]
pub struct AnchorGroup {
    pub name: &'static str,
    pub members: &'static [CanonicalLine],
}

/// Lines that must each be present for a high-confidence import.
pub const REQUIRED_ANCHORS: &[CanonicalLine] = &[
    CanonicalLine::new(UNITS, "Wall SF"),
    CanonicalLine::new(UNITS, "Count"),
    CanonicalLine::new(CORRIDORS, "Wall SF"),
];

pub const ANCHOR_GROUPS: &[AnchorGroup] = &[
    AnchorGroup {
        name: "exterior",
        members: &[
            CanonicalLine::new(EXTERIOR, "Siding SF"),
            CanonicalLine::new(EXTERIOR, "Trim LF"),
            CanonicalLine::new(EXTERIOR, "CMU SF"),
        ],
    },
    AnchorGroup {
        name: "stair levels",
        members: &[
            CanonicalLine::new(STAIRS, "Levels"),
            CanonicalLine::new(STAIRS, "Railing LF"),
        ],
    },
];

/// Maps a free-form section header onto a taxonomy section.
pub fn recognize_section(hint: &str) -> Option<&'static str> {
    let normalized = super::fields::normalize(hint);
    if normalized.is_empty() {
        return None;
    }

    SECTION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized.as_str())
        .map(|(_, section)| *section)
}

/// The normalized token rules use to name a section, e.g. `corridor`.
pub fn section_token(section: &str) -> Option<&'static str> {
    SECTION_ALIASES
        .iter()
        .find(|(_, canonical)| *canonical == section)
        .map(|(alias, _)| *alias)
}
