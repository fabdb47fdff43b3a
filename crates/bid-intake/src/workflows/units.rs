use serde::{Deserialize, Serialize};

/// Measurement kind carried by a field, inferred from its key or read from an
/// explicit unit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitKind {
    Sf,
    Lf,
    Ea,
    Lvl,
    Count,
    Unknown,
}

impl UnitKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sf => "SF",
            Self::Lf => "LF",
            Self::Ea => "EA",
            Self::Lvl => "LVL",
            Self::Count => "COUNT",
            Self::Unknown => "UNKNOWN",
        }
    }
}
