use crate::workflows::taxonomy::{IntentTarget, BALCONIES, EXTERIOR, GARAGE, SITE, STAIRS, UNITS};
use crate::workflows::units::UnitKind;
use serde::{Deserialize, Serialize};

/// Destination bucket of the classification path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    WallSf,
    CeilingSf,
    BaseLf,
    DoorsEa,
    TrimLf,
    SidingSf,
    CmuSf,
    SoffitSf,
    StairRailingLf,
    BalconyRailingLf,
    BalconyEa,
    GarageDoorsEa,
    FenceLf,
    BollardsEa,
}

impl Bucket {
    pub fn target(self) -> IntentTarget {
        let (section, label) = match self {
            Self::WallSf => (UNITS, "Wall SF"),
            Self::CeilingSf => (UNITS, "Ceiling SF"),
            Self::BaseLf => (UNITS, "Base LF"),
            Self::DoorsEa => (UNITS, "Doors"),
            Self::TrimLf => (EXTERIOR, "Trim LF"),
            Self::SidingSf => (EXTERIOR, "Siding SF"),
            Self::CmuSf => (EXTERIOR, "CMU SF"),
            Self::SoffitSf => (EXTERIOR, "Soffit SF"),
            Self::StairRailingLf => (STAIRS, "Railing LF"),
            Self::BalconyRailingLf => (BALCONIES, "Railing LF"),
            Self::BalconyEa => (BALCONIES, "Count"),
            Self::GarageDoorsEa => (GARAGE, "Doors"),
            Self::FenceLf => (SITE, "Fence LF"),
            Self::BollardsEa => (SITE, "Bollards"),
        };
        IntentTarget::bid_line(section, label)
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::WallSf => "WALL_SF",
            Self::CeilingSf => "CEILING_SF",
            Self::BaseLf => "BASE_LF",
            Self::DoorsEa => "DOORS_EA",
            Self::TrimLf => "TRIM_LF",
            Self::SidingSf => "SIDING_SF",
            Self::CmuSf => "CMU_SF",
            Self::SoffitSf => "SOFFIT_SF",
            Self::StairRailingLf => "STAIR_RAILING_LF",
            Self::BalconyRailingLf => "BALCONY_RAILING_LF",
            Self::BalconyEa => "BALCONY_EA",
            Self::GarageDoorsEa => "GARAGE_DOORS_EA",
            Self::FenceLf => "FENCE_LF",
            Self::BollardsEa => "BOLLARDS_EA",
        }
    }
}

/// First-match rule for rows that carry an explicit unit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedMappingRule {
    pub id: &'static str,
    pub includes: &'static [&'static str],
    pub excludes: &'static [&'static str],
    pub required_unit_kind: UnitKind,
    pub bucket: Bucket,
    pub label: &'static str,
}

impl OrderedMappingRule {
    pub fn matches(&self, tokens: &[&str], unit_kind: UnitKind) -> bool {
        self.required_unit_kind == unit_kind
            && self.includes.iter().all(|token| tokens.contains(token))
            && !self.excludes.iter().any(|token| tokens.contains(token))
    }
}

const fn rule(
    id: &'static str,
    includes: &'static [&'static str],
    excludes: &'static [&'static str],
    required_unit_kind: UnitKind,
    bucket: Bucket,
    label: &'static str,
) -> OrderedMappingRule {
    OrderedMappingRule {
        id,
        includes,
        excludes,
        required_unit_kind,
        bucket,
        label,
    }
}

/// Evaluated top to bottom. Specific rules sit above the generic ones they
/// would otherwise lose to.
pub const CLASSIFICATION_RULES: &[OrderedMappingRule] = &[
    rule(
        "chain_link_fence",
        &["chain_link_fence"],
        &[],
        UnitKind::Lf,
        Bucket::FenceLf,
        "Chain link fence",
    ),
    rule(
        "fence",
        &["fence"],
        &[],
        UnitKind::Lf,
        Bucket::FenceLf,
        "Fence",
    ),
    rule(
        "stair_railing",
        &["stair", "railing"],
        &[],
        UnitKind::Lf,
        Bucket::StairRailingLf,
        "Stair railing",
    ),
    rule(
        "balcony_railing",
        &["balcony", "railing"],
        &[],
        UnitKind::Lf,
        Bucket::BalconyRailingLf,
        "Balcony railing",
    ),
    rule(
        "base",
        &["base"],
        &[],
        UnitKind::Lf,
        Bucket::BaseLf,
        "Base",
    ),
    rule(
        "trim",
        &["trim"],
        &[],
        UnitKind::Lf,
        Bucket::TrimLf,
        "Exterior trim",
    ),
    rule(
        "cmu",
        &["cmu"],
        &[],
        UnitKind::Sf,
        Bucket::CmuSf,
        "CMU",
    ),
    rule(
        "siding",
        &["siding"],
        &[],
        UnitKind::Sf,
        Bucket::SidingSf,
        "Siding",
    ),
    rule(
        "soffit",
        &["soffit"],
        &["balcony"],
        UnitKind::Sf,
        Bucket::SoffitSf,
        "Soffit",
    ),
    rule(
        "ceiling",
        &["ceiling"],
        &[],
        UnitKind::Sf,
        Bucket::CeilingSf,
        "Ceiling",
    ),
    rule(
        "wall",
        &["wall"],
        &["cmu", "retaining"],
        UnitKind::Sf,
        Bucket::WallSf,
        "Wall",
    ),
    rule(
        "garage_door",
        &["garage_door"],
        &[],
        UnitKind::Ea,
        Bucket::GarageDoorsEa,
        "Garage door",
    ),
    rule(
        "door",
        &["door"],
        &[],
        UnitKind::Ea,
        Bucket::DoorsEa,
        "Door",
    ),
    rule(
        "bollard",
        &["bollard"],
        &[],
        UnitKind::Ea,
        Bucket::BollardsEa,
        "Bollard",
    ),
    rule(
        "balcony",
        &["balcony"],
        &["railing"],
        UnitKind::Ea,
        Bucket::BalconyEa,
        "Balcony",
    ),
];
