use super::custom::CustomMappingSnapshot;
use super::normalizer::{detect_unit_kind, normalize, tokenize};
use super::rules::{standard_rules, MappingRule};
use crate::workflows::taxonomy::IntentTarget;
use crate::workflows::units::UnitKind;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub const CONFIDENCE_THRESHOLD: i32 = 80;
pub const SEPARATION_THRESHOLD: i32 = 8;
pub const CUSTOM_MAPPING_RULE_ID: &str = "custom_mapping";

const REQUIRED_TOKEN_WEIGHT: i32 = 5;
const ANY_OF_TOKEN_WEIGHT: i32 = 2;
const MAX_CANDIDATES: usize = 3;

/// Absolute and relative bars a top-scoring rule must clear to be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionThresholds {
    pub confidence: i32,
    pub separation: i32,
}

impl Default for ResolutionThresholds {
    fn default() -> Self {
        Self {
            confidence: CONFIDENCE_THRESHOLD,
            separation: SEPARATION_THRESHOLD,
        }
    }
}

/// A rule that scored above zero for a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub rule_id: String,
    pub score: i32,
    pub target: IntentTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    NoRuleMatched,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NoRuleMatched => write!(f, "no rule matched"),
        }
    }
}

/// What the resolver saw when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionDetails {
    pub normalized_key: String,
    pub unit_kind: UnitKind,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResult {
    Mapped {
        target: IntentTarget,
        rule_id: String,
        explanation: String,
    },
    Ambiguous {
        candidates: Vec<Candidate>,
        explanation: String,
    },
    Unmapped {
        reason: UnresolvedReason,
        explanation: String,
        details: ResolutionDetails,
    },
}

impl ResolutionResult {
    pub fn explanation(&self) -> &str {
        match self {
            Self::Mapped { explanation, .. }
            | Self::Ambiguous { explanation, .. }
            | Self::Unmapped { explanation, .. } => explanation,
        }
    }
}

/// Resolution of one field together with the derived key facts the importer
/// reports alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResolution {
    pub normalized_key: String,
    pub unit_kind: UnitKind,
    pub result: ResolutionResult,
}

/// Scores a rule against a tokenized key. Zero means disqualified.
pub fn score_rule(rule: &MappingRule, tokens: &[&str], unit_kind: UnitKind) -> i32 {
    let present = |token: &&str| tokens.contains(token);

    if !rule.required_tokens.iter().all(present) {
        return 0;
    }

    let any_of_matched = rule.any_of_tokens.iter().filter(|t| present(t)).count() as i32;
    if !rule.any_of_tokens.is_empty() && any_of_matched == 0 {
        return 0;
    }

    if rule.excluded_tokens.iter().any(present) {
        return 0;
    }

    if let Some(required) = rule.required_unit_kind {
        if required != unit_kind {
            return 0;
        }
    }

    rule.priority
        + REQUIRED_TOKEN_WEIGHT * rule.required_tokens.len() as i32
        + ANY_OF_TOKEN_WEIGHT * any_of_matched
}

/// Score-based intent resolver over an unordered rule set.
#[derive(Debug, Clone)]
pub struct IntentResolver {
    rules: Vec<MappingRule>,
    thresholds: ResolutionThresholds,
}

impl Default for IntentResolver {
    fn default() -> Self {
        Self::standard(ResolutionThresholds::default())
    }
}

impl IntentResolver {
    pub fn new(rules: Vec<MappingRule>, thresholds: ResolutionThresholds) -> Self {
        Self { rules, thresholds }
    }

    pub fn standard(thresholds: ResolutionThresholds) -> Self {
        Self::new(standard_rules().to_vec(), thresholds)
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn thresholds(&self) -> ResolutionThresholds {
        self.thresholds
    }

    pub fn resolve_intent(
        &self,
        raw_key: &str,
        value: Option<f64>,
        mappings: &CustomMappingSnapshot,
    ) -> ResolutionResult {
        self.resolve_field(raw_key, value, mappings).result
    }

    pub fn resolve_field(
        &self,
        raw_key: &str,
        value: Option<f64>,
        mappings: &CustomMappingSnapshot,
    ) -> FieldResolution {
        let normalized_key = normalize(raw_key);
        let unit_kind = detect_unit_kind(&normalized_key, value);
        let result = self.decide(&normalized_key, unit_kind, mappings);

        FieldResolution {
            normalized_key,
            unit_kind,
            result,
        }
    }

    /// All scoring rules ranked by `(score desc, priority desc, id asc)`.
    pub fn ranked_candidates(&self, tokens: &[&str], unit_kind: UnitKind) -> Vec<Candidate> {
        let mut scored: Vec<(i32, &MappingRule)> = self
            .rules
            .iter()
            .map(|rule| (score_rule(rule, tokens, unit_kind), rule))
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|(score_a, rule_a), (score_b, rule_b)| {
            score_b
                .cmp(score_a)
                .then_with(|| rule_b.priority.cmp(&rule_a.priority))
                .then_with(|| rule_a.id.cmp(rule_b.id))
        });

        scored
            .into_iter()
            .map(|(score, rule)| Candidate {
                rule_id: rule.id.to_string(),
                score,
                target: rule.target.clone(),
            })
            .collect()
    }

    fn decide(
        &self,
        normalized_key: &str,
        unit_kind: UnitKind,
        mappings: &CustomMappingSnapshot,
    ) -> ResolutionResult {
        if let Some(mapping) = mappings.lookup(normalized_key) {
            return ResolutionResult::Mapped {
                target: mapping.target.clone(),
                rule_id: CUSTOM_MAPPING_RULE_ID.to_string(),
                explanation: format!(
                    "custom mapping for '{normalized_key}' confirmed {}",
                    mapping.created_at.format("%Y-%m-%d")
                ),
            };
        }

        let tokens = tokenize(normalized_key);
        let candidates = distinct_targets(self.ranked_candidates(&tokens, unit_kind));

        let Some(top) = candidates.first() else {
            return ResolutionResult::Unmapped {
                reason: UnresolvedReason::NoRuleMatched,
                explanation: format!(
                    "no rule matched '{normalized_key}' ({})",
                    unit_kind.label()
                ),
                details: ResolutionDetails {
                    normalized_key: normalized_key.to_string(),
                    unit_kind,
                    tokens: tokens.iter().map(|token| token.to_string()).collect(),
                },
            };
        };

        let second = candidates.get(1);
        let clears_bar = top.score >= self.thresholds.confidence;
        let separated = second
            .map(|runner_up| top.score - runner_up.score >= self.thresholds.separation)
            .unwrap_or(true);

        if clears_bar && separated {
            let explanation = match second {
                Some(runner_up) => format!(
                    "rule {} scored {} ahead of {} at {}",
                    top.rule_id, top.score, runner_up.rule_id, runner_up.score
                ),
                None => format!("rule {} scored {}", top.rule_id, top.score),
            };
            return ResolutionResult::Mapped {
                target: top.target.clone(),
                rule_id: top.rule_id.clone(),
                explanation,
            };
        }

        let explanation = if !clears_bar {
            format!(
                "best rule {} scored {} below the {} confidence bar",
                top.rule_id, top.score, self.thresholds.confidence
            )
        } else {
            let runner_up = second.map(|c| c.score).unwrap_or_default();
            format!(
                "rule {} scored {} within {} of a competing rule at {}",
                top.rule_id, top.score, self.thresholds.separation, runner_up
            )
        };

        ResolutionResult::Ambiguous {
            candidates: candidates.into_iter().take(MAX_CANDIDATES).collect(),
            explanation,
        }
    }
}

/// Keeps the best-ranked candidate per target so that two rules agreeing on
/// the same line never count as competitors.
fn distinct_targets(ranked: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|candidate| seen.insert(candidate.target.clone()))
        .collect()
}
