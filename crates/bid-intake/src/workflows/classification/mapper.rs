use super::normalizer::suggested_tokens;
use super::rules::{Bucket, OrderedMappingRule, CLASSIFICATION_RULES};
use crate::workflows::units::UnitKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketMatch {
    pub bucket: Bucket,
    pub label: &'static str,
    pub rule_id: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingFailure {
    #[error("unit of measure is not supported")]
    UnsupportedUom,
    #[error("no classification rule matched")]
    NoRuleMatch { suggested_tokens: Vec<String> },
}

/// First-match lookup over [`CLASSIFICATION_RULES`]. An unrecognized unit
/// fails before any token is inspected.
pub fn map_row_to_bucket(
    classification_key: &str,
    unit_kind: UnitKind,
    raw_text: &str,
) -> Result<BucketMatch, MappingFailure> {
    map_with_rules(CLASSIFICATION_RULES, classification_key, unit_kind, raw_text)
}

pub fn map_with_rules(
    rules: &[OrderedMappingRule],
    classification_key: &str,
    unit_kind: UnitKind,
    raw_text: &str,
) -> Result<BucketMatch, MappingFailure> {
    if unit_kind == UnitKind::Unknown {
        return Err(MappingFailure::UnsupportedUom);
    }

    let tokens: Vec<&str> = classification_key.split_whitespace().collect();
    rules
        .iter()
        .find(|rule| rule.matches(&tokens, unit_kind))
        .map(|rule| BucketMatch {
            bucket: rule.bucket,
            label: rule.label,
            rule_id: rule.id,
        })
        .ok_or_else(|| MappingFailure::NoRuleMatch {
            suggested_tokens: suggested_tokens(raw_text),
        })
}
