//! Score-based resolution of free-form spreadsheet fields.
//!
//! Keys are normalized, scored against the intent rule set, and folded into an
//! [`ImportReport`]. Custom mappings are read from a snapshot taken once per
//! batch.

mod custom;
mod normalizer;
pub(crate) mod parser;
mod resolver;
mod rules;

use crate::workflows::report::{
    item_key, IgnoredReason, IgnoredRow, ImportReport, MappedField, ReportBuilder, ReportPolicy,
    Suggestion, UnmappedField, UnmappedReason,
};
use crate::workflows::taxonomy::{recognize_section, section_token};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub use custom::{
    CustomMapping, CustomMappingSnapshot, CustomMappingStore, CustomMappingTable,
    MappingStoreError,
};
pub use normalizer::{detect_unit_kind, normalize, tokenize};
pub use resolver::{
    score_rule, Candidate, FieldResolution, IntentResolver, ResolutionDetails, ResolutionResult,
    ResolutionThresholds, UnresolvedReason, CONFIDENCE_THRESHOLD, CUSTOM_MAPPING_RULE_ID,
    SEPARATION_THRESHOLD,
};
pub use rules::{standard_rules, MappingRule};

/// One spreadsheet field as supplied by the row reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub raw_key: String,
    #[serde(default)]
    pub value_numeric: Option<f64>,
    #[serde(default)]
    pub section_hint: Option<String>,
}

impl RawField {
    pub fn new(raw_key: impl Into<String>, value_numeric: Option<f64>) -> Self {
        Self {
            raw_key: raw_key.into(),
            value_numeric,
            section_hint: None,
        }
    }

    pub fn with_section(mut self, section_hint: impl Into<String>) -> Self {
        self.section_hint = Some(section_hint.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FieldImportError {
    #[error("failed to read field export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid field CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("field export is missing the '{0}' column")]
    MissingColumn(&'static str),
}

/// Resolves a batch of fields into an [`ImportReport`].
#[derive(Debug, Clone, Default)]
pub struct FieldImporter {
    resolver: IntentResolver,
    policy: ReportPolicy,
}

impl FieldImporter {
    pub fn new(thresholds: ResolutionThresholds, policy: ReportPolicy) -> Self {
        Self::with_resolver(IntentResolver::standard(thresholds), policy)
    }

    pub fn with_resolver(resolver: IntentResolver, policy: ReportPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn resolver(&self) -> &IntentResolver {
        &self.resolver
    }

    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
        mappings: &CustomMappingSnapshot,
    ) -> Result<ImportReport, FieldImportError> {
        let file = std::fs::File::open(path)?;
        self.from_reader(file, mappings)
    }

    pub fn from_reader<R: Read>(
        &self,
        reader: R,
        mappings: &CustomMappingSnapshot,
    ) -> Result<ImportReport, FieldImportError> {
        let rows = parser::parse_fields(reader)?;
        Ok(self.build_report(rows, mappings))
    }

    /// Resolves already-acquired fields. Row indexes follow iteration order.
    pub fn import<I>(&self, fields: I, mappings: &CustomMappingSnapshot) -> ImportReport
    where
        I: IntoIterator<Item = RawField>,
    {
        self.build_report(fields.into_iter().map(Ok), mappings)
    }

    fn build_report<I>(&self, rows: I, mappings: &CustomMappingSnapshot) -> ImportReport
    where
        I: IntoIterator<Item = parser::ParsedRow<RawField>>,
    {
        let mut report = ReportBuilder::new(self.policy);

        for (row_index, row) in rows.into_iter().enumerate() {
            match row {
                Ok(field) => self.record_field(row_index, field, mappings, &mut report),
                Err(ignored) => {
                    debug!(row_index, reason = ignored.reason.label(), "skipped field row");
                    report.ignored(ignored);
                }
            }
        }

        let report = report.finish();
        info!(
            parsed = report.summary.parsed_rows,
            mapped = report.summary.mapped_rows,
            unmapped = report.summary.unmapped_rows,
            ignored = report.summary.ignored_rows,
            confidence = report.summary.confidence.label(),
            custom_mappings = mappings.len(),
            "field import resolved"
        );
        report
    }

    fn record_field(
        &self,
        row_index: usize,
        field: RawField,
        mappings: &CustomMappingSnapshot,
        report: &mut ReportBuilder,
    ) {
        let RawField {
            raw_key,
            value_numeric,
            section_hint,
        } = field;

        if normalize(&raw_key).is_empty() {
            report.ignored(IgnoredRow {
                row_index,
                raw_key,
                reason: IgnoredReason::BlankKey,
                detail: "key is blank after normalization".to_string(),
            });
            return;
        }

        if let Some(value) = value_numeric.filter(|value| !value.is_finite()) {
            report.ignored(IgnoredRow {
                row_index,
                raw_key,
                reason: IgnoredReason::NonNumericValue,
                detail: format!("value {value} is not a finite number"),
            });
            return;
        }

        let recognized = section_hint.as_deref().and_then(recognize_section);
        let resolution = self.resolve_in_section(&raw_key, value_numeric, recognized, mappings);
        let FieldResolution {
            normalized_key,
            unit_kind,
            result,
        } = resolution;

        let unmapped = |reason: UnmappedReason,
                        explanation: String,
                        suggestions: Vec<Suggestion>,
                        suggested_tokens: Vec<String>| {
            let section_guess = recognized
                .map(str::to_string)
                .or_else(|| suggestions.first().map(|s| s.target.section().to_string()));
            UnmappedField {
                item_key: item_key(section_guess.as_deref(), &normalized_key, row_index),
                row_index,
                raw_key: raw_key.clone(),
                normalized_key: normalized_key.clone(),
                section_guess,
                value: value_numeric,
                unit_kind,
                reason,
                explanation,
                suggestions,
                suggested_tokens,
            }
        };

        match (value_numeric, result) {
            (
                Some(value),
                ResolutionResult::Mapped {
                    target,
                    rule_id,
                    explanation,
                },
            ) if target.is_existing_line() => {
                debug!(
                    row_index,
                    key = %raw_key,
                    target = %target,
                    rule_id = %rule_id,
                    "mapped field"
                );
                report.mapped(MappedField {
                    row_index,
                    raw_key: raw_key.clone(),
                    normalized_key: normalized_key.clone(),
                    value,
                    unit_kind,
                    target,
                    rule_id,
                    bucket: None,
                    explanation,
                });
            }
            (
                Some(_),
                ResolutionResult::Mapped {
                    target, rule_id, ..
                },
            ) => {
                debug!(row_index, key = %raw_key, suggestion = %target, "field needs a new line");
                let explanation = format!("no existing line fits; suggested new line {target}");
                report.unmapped(unmapped(
                    UnmappedReason::UnrecognizedKey,
                    explanation,
                    vec![Suggestion {
                        target,
                        rule_id,
                        score: None,
                    }],
                    Vec::new(),
                ));
            }
            (
                None,
                ResolutionResult::Mapped {
                    target, rule_id, ..
                },
            ) if target.is_existing_line() => {
                debug!(row_index, key = %raw_key, target = %target, "mapped field has no value");
                let explanation = format!("key matches {target} but the row has no value");
                report.unmapped(unmapped(
                    UnmappedReason::NoValue,
                    explanation,
                    vec![Suggestion {
                        target,
                        rule_id,
                        score: None,
                    }],
                    Vec::new(),
                ));
            }
            (None, _) => {
                debug!(row_index, key = %raw_key, "treating valueless row as a header");
                report.ignored(IgnoredRow {
                    row_index,
                    raw_key: raw_key.clone(),
                    reason: IgnoredReason::MissingValue,
                    detail: "row has no value and no confident mapping".to_string(),
                });
            }
            (
                Some(_),
                ResolutionResult::Ambiguous {
                    candidates,
                    explanation,
                },
            ) => {
                debug!(row_index, key = %raw_key, candidates = candidates.len(), "ambiguous field");
                let suggestions = candidates
                    .into_iter()
                    .map(|candidate| Suggestion {
                        target: candidate.target,
                        rule_id: candidate.rule_id,
                        score: Some(candidate.score),
                    })
                    .collect();
                report.unmapped(unmapped(
                    UnmappedReason::Ambiguous,
                    explanation,
                    suggestions,
                    Vec::new(),
                ));
            }
            (
                Some(_),
                ResolutionResult::Unmapped {
                    explanation,
                    details,
                    ..
                },
            ) => {
                let reason = if section_hint.is_some() && recognized.is_none() {
                    UnmappedReason::UnrecognizedSection
                } else {
                    UnmappedReason::UnrecognizedKey
                };
                debug!(row_index, key = %raw_key, reason = reason.label(), "unmapped field");
                let explanation = match (&section_hint, reason) {
                    (Some(hint), UnmappedReason::UnrecognizedSection) => {
                        format!("{explanation}; section '{hint}' is not recognized")
                    }
                    _ => explanation,
                };
                let suggested_tokens = details
                    .tokens
                    .into_iter()
                    .filter(|token| token.chars().count() > 2)
                    .collect();
                report.unmapped(unmapped(reason, explanation, Vec::new(), suggested_tokens));
            }
        }
    }

    /// Resolves the key on its own first. When that is not conclusive and the
    /// row sits under a recognized section header, the section's token is
    /// prefixed and the key is resolved again.
    fn resolve_in_section(
        &self,
        raw_key: &str,
        value: Option<f64>,
        section: Option<&'static str>,
        mappings: &CustomMappingSnapshot,
    ) -> FieldResolution {
        let resolution = self.resolver.resolve_field(raw_key, value, mappings);
        if matches!(resolution.result, ResolutionResult::Mapped { .. }) {
            return resolution;
        }

        let Some((section, token)) = section.and_then(|s| section_token(s).map(|t| (s, t))) else {
            return resolution;
        };
        if tokenize(&resolution.normalized_key).contains(&token) {
            return resolution;
        }

        let contextual = self
            .resolver
            .resolve_field(&format!("{token} {raw_key}"), value, mappings);
        match contextual.result {
            ResolutionResult::Mapped {
                target,
                rule_id,
                explanation,
            } => FieldResolution {
                result: ResolutionResult::Mapped {
                    target,
                    rule_id,
                    explanation: format!("{explanation} under section {section}"),
                },
                ..resolution
            },
            _ => resolution,
        }
    }
}

/// Convenience wrapper resolving one key with the standard rule set.
pub fn resolve_intent(
    raw_key: &str,
    value: Option<f64>,
    mappings: &CustomMappingSnapshot,
) -> ResolutionResult {
    IntentResolver::default().resolve_intent(raw_key, value, mappings)
}
