use crate::workflows::taxonomy::{
    IntentTarget, AMENITY, BALCONIES, CORRIDORS, EXTERIOR, GARAGE, SITE, STAIRS, UNITS,
};
use crate::workflows::units::UnitKind;
use std::sync::OnceLock;

/// Declarative intent rule scored against the tokens of a normalized key.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    pub id: &'static str,
    pub required_tokens: &'static [&'static str],
    pub any_of_tokens: &'static [&'static str],
    pub excluded_tokens: &'static [&'static str],
    pub required_unit_kind: Option<UnitKind>,
    pub priority: i32,
    pub target: IntentTarget,
}

#[derive(Clone, Copy)]
enum TargetSpec {
    Bid(&'static str, &'static str),
    Alternate(&'static str, &'static str),
    Create(&'static str, &'static str),
}

struct RuleSpec {
    id: &'static str,
    required: &'static [&'static str],
    any_of: &'static [&'static str],
    excluded: &'static [&'static str],
    unit: Option<UnitKind>,
    priority: i32,
    target: TargetSpec,
}

use TargetSpec::{Alternate, Bid, Create};

const SF: Option<UnitKind> = Some(UnitKind::Sf);
const LF: Option<UnitKind> = Some(UnitKind::Lf);

const RULES: &[RuleSpec] = &[
    // Units
    RuleSpec {
        id: "unit_wall_sf",
        required: &["unit", "wall"],
        any_of: &[],
        excluded: &["accent"],
        unit: SF,
        priority: 72,
        target: Bid(UNITS, "Wall SF"),
    },
    RuleSpec {
        id: "wall_sf_fallback",
        required: &["wall"],
        any_of: &[],
        excluded: &[
            "unit", "corridor", "stair", "exterior", "balcony", "garage", "amenity", "accent",
            "cmu", "retaining",
        ],
        unit: SF,
        priority: 66,
        target: Bid(UNITS, "Wall SF"),
    },
    RuleSpec {
        id: "unit_ceiling_sf",
        required: &["unit", "ceiling"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(UNITS, "Ceiling SF"),
    },
    RuleSpec {
        id: "unit_doors",
        required: &["unit", "door"],
        any_of: &[],
        excluded: &["garage"],
        unit: None,
        priority: 72,
        target: Bid(UNITS, "Doors"),
    },
    RuleSpec {
        id: "unit_base_lf",
        required: &["unit", "base"],
        any_of: &[],
        excluded: &[],
        unit: LF,
        priority: 72,
        target: Bid(UNITS, "Base LF"),
    },
    RuleSpec {
        id: "unit_count",
        required: &["unit"],
        any_of: &["count", "total", "number"],
        excluded: &["wall", "ceiling", "door", "base", "accent"],
        unit: None,
        priority: 74,
        target: Bid(UNITS, "Count"),
    },
    // Corridors
    RuleSpec {
        id: "corridor_wall_sf",
        required: &["corridor", "wall"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(CORRIDORS, "Wall SF"),
    },
    RuleSpec {
        id: "corridor_ceiling_sf",
        required: &["corridor", "ceiling"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(CORRIDORS, "Ceiling SF"),
    },
    RuleSpec {
        id: "corridor_doors",
        required: &["corridor", "door"],
        any_of: &[],
        excluded: &[],
        unit: None,
        priority: 72,
        target: Bid(CORRIDORS, "Doors"),
    },
    RuleSpec {
        id: "corridor_base_lf",
        required: &["corridor", "base"],
        any_of: &[],
        excluded: &[],
        unit: LF,
        priority: 72,
        target: Bid(CORRIDORS, "Base LF"),
    },
    // Stairs
    RuleSpec {
        id: "stair_levels",
        required: &["stair", "level"],
        any_of: &[],
        excluded: &["railing", "wall"],
        unit: None,
        priority: 72,
        target: Bid(STAIRS, "Levels"),
    },
    RuleSpec {
        id: "stair_wall_sf",
        required: &["stair", "wall"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(STAIRS, "Wall SF"),
    },
    RuleSpec {
        id: "stair_railing_lf",
        required: &["stair", "railing"],
        any_of: &[],
        excluded: &[],
        unit: LF,
        priority: 72,
        target: Bid(STAIRS, "Railing LF"),
    },
    // Exterior
    RuleSpec {
        id: "exterior_siding_sf",
        required: &["siding"],
        any_of: &["exterior", "building", "lap", "hardie"],
        excluded: &["soffit", "trim"],
        unit: SF,
        priority: 73,
        target: Bid(EXTERIOR, "Siding SF"),
    },
    RuleSpec {
        id: "exterior_trim_lf",
        required: &["exterior", "trim"],
        any_of: &[],
        excluded: &[],
        unit: LF,
        priority: 72,
        target: Bid(EXTERIOR, "Trim LF"),
    },
    RuleSpec {
        id: "exterior_doors",
        required: &["exterior", "door"],
        any_of: &[],
        excluded: &["garage"],
        unit: None,
        priority: 72,
        target: Bid(EXTERIOR, "Doors"),
    },
    RuleSpec {
        id: "exterior_cmu_sf",
        required: &["cmu"],
        any_of: &["exterior", "wall", "block"],
        excluded: &["garage"],
        unit: SF,
        priority: 74,
        target: Bid(EXTERIOR, "CMU SF"),
    },
    RuleSpec {
        id: "exterior_soffit_sf",
        required: &["soffit"],
        any_of: &["exterior", "eave", "overhang"],
        excluded: &["balcony"],
        unit: SF,
        priority: 74,
        target: Bid(EXTERIOR, "Soffit SF"),
    },
    // Balconies
    RuleSpec {
        id: "balcony_count",
        required: &["balcony"],
        any_of: &["count", "total", "number"],
        excluded: &["railing", "ceiling", "soffit"],
        unit: None,
        priority: 74,
        target: Bid(BALCONIES, "Count"),
    },
    RuleSpec {
        id: "balcony_railing_lf",
        required: &["balcony", "railing"],
        any_of: &[],
        excluded: &[],
        unit: LF,
        priority: 72,
        target: Bid(BALCONIES, "Railing LF"),
    },
    RuleSpec {
        id: "balcony_ceiling_sf",
        required: &["balcony"],
        any_of: &["ceiling", "soffit"],
        excluded: &[],
        unit: SF,
        priority: 74,
        target: Bid(BALCONIES, "Ceiling SF"),
    },
    // Garage
    RuleSpec {
        id: "garage_wall_sf",
        required: &["garage", "wall"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(GARAGE, "Wall SF"),
    },
    RuleSpec {
        id: "garage_ceiling_sf",
        required: &["garage", "ceiling"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(GARAGE, "Ceiling SF"),
    },
    RuleSpec {
        id: "garage_doors",
        required: &["garage", "door"],
        any_of: &[],
        excluded: &[],
        unit: None,
        priority: 74,
        target: Bid(GARAGE, "Doors"),
    },
    // Generic doors compete with the location-specific door rules only through
    // this exclusion list.
    RuleSpec {
        id: "doors_fallback",
        required: &["door"],
        any_of: &[],
        excluded: &["garage", "corridor", "exterior", "stair", "amenity"],
        unit: None,
        priority: 66,
        target: Bid(UNITS, "Doors"),
    },
    // Amenity
    RuleSpec {
        id: "amenity_wall_sf",
        required: &["amenity", "wall"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(AMENITY, "Wall SF"),
    },
    RuleSpec {
        id: "amenity_ceiling_sf",
        required: &["amenity", "ceiling"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Bid(AMENITY, "Ceiling SF"),
    },
    // Site
    RuleSpec {
        id: "site_fence_lf",
        required: &["fence"],
        any_of: &[],
        excluded: &[],
        unit: LF,
        priority: 75,
        target: Bid(SITE, "Fence LF"),
    },
    RuleSpec {
        id: "site_bollards",
        required: &["bollard"],
        any_of: &[],
        excluded: &[],
        unit: None,
        priority: 75,
        target: Bid(SITE, "Bollards"),
    },
    // Alternates and new-line suggestions
    RuleSpec {
        id: "unit_accent_wall_alt",
        required: &["accent", "wall"],
        any_of: &[],
        excluded: &[],
        unit: SF,
        priority: 72,
        target: Alternate(UNITS, "Accent Wall SF"),
    },
    RuleSpec {
        id: "exterior_elastomeric_alt",
        required: &["elastomeric"],
        any_of: &["exterior", "coating", "wall"],
        excluded: &[],
        unit: SF,
        priority: 74,
        target: Alternate(EXTERIOR, "Elastomeric Coating SF"),
    },
    RuleSpec {
        id: "site_signage_create",
        required: &["signage"],
        any_of: &[],
        excluded: &[],
        unit: None,
        priority: 75,
        target: Create(SITE, "Signage"),
    },
];

static STANDARD_RULES: OnceLock<Vec<MappingRule>> = OnceLock::new();

/// The built-in intent rules. Order carries no meaning for this rule set.
pub fn standard_rules() -> &'static [MappingRule] {
    STANDARD_RULES.get_or_init(|| {
        RULES
            .iter()
            .map(|entry| MappingRule {
                id: entry.id,
                required_tokens: entry.required,
                any_of_tokens: entry.any_of,
                excluded_tokens: entry.excluded,
                required_unit_kind: entry.unit,
                priority: entry.priority,
                target: match entry.target {
                    Bid(section, label) => IntentTarget::bid_line(section, label),
                    Alternate(section, label) => IntentTarget::alternate_line(section, label),
                    Create(section, label) => IntentTarget::create_line(section, label),
                },
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn rule_ids_are_unique() {
        let mut seen = HashSet::new();
        for rule in standard_rules() {
            assert!(seen.insert(rule.id), "duplicate rule id {}", rule.id);
        }
    }

    #[test]
    fn every_rule_targets_a_single_canonical_line() {
        for rule in standard_rules() {
            match &rule.target {
                IntentTarget::CreateLine { .. } => {
                    assert!(!rule.target.is_known(), "{} suggests an existing line", rule.id)
                }
                target => assert!(target.is_known(), "{} targets unknown {target}", rule.id),
            }
        }
    }

    #[test]
    fn rule_tokens_are_already_normalized() {
        use super::super::normalizer::normalize;

        for rule in standard_rules() {
            for token in rule
                .required_tokens
                .iter()
                .chain(rule.any_of_tokens)
                .chain(rule.excluded_tokens)
            {
                assert_eq!(normalize(token), *token, "rule {} token {token}", rule.id);
            }
        }
    }

    #[test]
    fn required_and_excluded_tokens_do_not_overlap() {
        for rule in standard_rules() {
            for token in rule.required_tokens.iter().chain(rule.any_of_tokens) {
                assert!(
                    !rule.excluded_tokens.contains(token),
                    "rule {} both requires and excludes {token}",
                    rule.id
                );
            }
        }
    }
}
