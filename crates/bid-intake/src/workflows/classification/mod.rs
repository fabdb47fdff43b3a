//! Ordered first-match resolution for takeoff rows that already carry an
//! explicit unit code.

mod mapper;
mod normalizer;
mod parser;
mod rules;

use crate::workflows::report::{
    item_key, IgnoredReason, IgnoredRow, ImportReport, MappedField, ReportBuilder, ReportPolicy,
    UnmappedField, UnmappedReason,
};
use crate::workflows::units::UnitKind;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub use mapper::{map_row_to_bucket, map_with_rules, BucketMatch, MappingFailure};
pub use normalizer::{normalize_classification, suggested_tokens, unit_kind_for_code};
pub use rules::{Bucket, OrderedMappingRule, CLASSIFICATION_RULES};

/// One takeoff row with an explicit unit code and an optional second
/// quantity in another unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRow {
    pub classification_text: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_code: String,
    #[serde(default)]
    pub quantity2: Option<f64>,
    #[serde(default)]
    pub unit_code2: Option<String>,
}

impl ClassificationRow {
    pub fn new(text: impl Into<String>, quantity: f64, unit_code: impl Into<String>) -> Self {
        Self {
            classification_text: text.into(),
            quantity: Some(quantity),
            unit_code: unit_code.into(),
            quantity2: None,
            unit_code2: None,
        }
    }

    pub fn with_secondary(mut self, quantity: f64, unit_code: impl Into<String>) -> Self {
        self.quantity2 = Some(quantity);
        self.unit_code2 = Some(unit_code.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassificationImportError {
    #[error("failed to read classification export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid classification CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("classification export is missing the '{0}' column")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationImporter {
    policy: ReportPolicy,
}

struct Attempt<'a> {
    quantity: f64,
    unit_code: &'a str,
    unit_kind: UnitKind,
    secondary: bool,
    outcome: Result<BucketMatch, MappingFailure>,
}

impl ClassificationImporter {
    pub fn new(policy: ReportPolicy) -> Self {
        Self { policy }
    }

    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<ImportReport, ClassificationImportError> {
        let file = std::fs::File::open(path)?;
        self.from_reader(file)
    }

    pub fn from_reader<R: Read>(
        &self,
        reader: R,
    ) -> Result<ImportReport, ClassificationImportError> {
        let rows = parser::parse_classifications(reader)?;
        Ok(self.build_report(rows))
    }

    pub fn import<I>(&self, rows: I) -> ImportReport
    where
        I: IntoIterator<Item = ClassificationRow>,
    {
        self.build_report(rows.into_iter().map(Ok))
    }

    fn build_report<I>(&self, rows: I) -> ImportReport
    where
        I: IntoIterator<Item = Result<ClassificationRow, IgnoredRow>>,
    {
        let mut report = ReportBuilder::new(self.policy);

        for (row_index, row) in rows.into_iter().enumerate() {
            match row {
                Ok(row) => record_row(row_index, row, &mut report),
                Err(ignored) => {
                    debug!(
                        row_index,
                        reason = ignored.reason.label(),
                        "skipped classification row"
                    );
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
            "classification import resolved"
        );
        report
    }
}

fn record_row(row_index: usize, row: ClassificationRow, report: &mut ReportBuilder) {
    let key = normalize_classification(&row.classification_text);
    if key.is_empty() {
        report.ignored(IgnoredRow {
            row_index,
            raw_key: row.classification_text,
            reason: IgnoredReason::BlankKey,
            detail: "classification is blank after normalization".to_string(),
        });
        return;
    }

    let text = row.classification_text.as_str();
    let primary = attempt(&key, text, row.quantity, Some(row.unit_code.as_str()), false);
    let secondary = || attempt(&key, text, row.quantity2, row.unit_code2.as_deref(), true);

    // The primary failure is the one reported when both pairs fail.
    let chosen = match primary {
        Some(primary) if primary.outcome.is_ok() => primary,
        Some(primary) => match secondary() {
            Some(secondary) if secondary.outcome.is_ok() => secondary,
            _ => primary,
        },
        None => match secondary() {
            Some(secondary) => secondary,
            None => {
                report.ignored(IgnoredRow {
                    row_index,
                    raw_key: text.to_string(),
                    reason: IgnoredReason::MissingValue,
                    detail: "row has no quantity".to_string(),
                });
                return;
            }
        },
    };

    match chosen.outcome {
        Ok(matched) => {
            debug!(
                row_index,
                text = %text,
                bucket = matched.bucket.code(),
                "mapped classification"
            );
            let mut explanation = format!(
                "rule {} matched '{}' in {}",
                matched.rule_id,
                key,
                chosen.unit_kind.label()
            );
            if chosen.secondary {
                explanation.push_str(&format!(" using secondary unit {}", chosen.unit_code));
            }
            report.mapped(MappedField {
                row_index,
                raw_key: text.to_string(),
                normalized_key: key.clone(),
                value: chosen.quantity,
                unit_kind: chosen.unit_kind,
                target: matched.bucket.target(),
                rule_id: matched.rule_id.to_string(),
                bucket: Some(matched.bucket),
                explanation,
            });
        }
        Err(failure) => {
            let (reason, explanation, suggested) = match failure {
                MappingFailure::UnsupportedUom => (
                    UnmappedReason::UnsupportedUom,
                    format!("unit '{}' is not a supported unit of measure", chosen.unit_code),
                    Vec::new(),
                ),
                MappingFailure::NoRuleMatch { suggested_tokens } => (
                    UnmappedReason::UnrecognizedKey,
                    format!(
                        "no classification rule matched '{}' in {}",
                        key,
                        chosen.unit_kind.label()
                    ),
                    suggested_tokens,
                ),
            };
            debug!(row_index, text = %text, reason = reason.label(), "unmapped classification");
            report.unmapped(UnmappedField {
                item_key: item_key(None, &key, row_index),
                row_index,
                raw_key: text.to_string(),
                normalized_key: key.clone(),
                section_guess: None,
                value: Some(chosen.quantity),
                unit_kind: chosen.unit_kind,
                reason,
                explanation,
                suggestions: Vec::new(),
                suggested_tokens: suggested,
            });
        }
    }
}

fn attempt<'a>(
    key: &str,
    text: &str,
    quantity: Option<f64>,
    unit_code: Option<&'a str>,
    secondary: bool,
) -> Option<Attempt<'a>> {
    let quantity = quantity.filter(|value| value.is_finite())?;
    let unit_code = unit_code.unwrap_or_default();
    let unit_kind = unit_kind_for_code(unit_code);

    Some(Attempt {
        quantity,
        unit_code,
        unit_kind,
        secondary,
        outcome: map_row_to_bucket(key, unit_kind, text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::taxonomy::{IntentTarget, BALCONIES, SITE};
    use std::io::Cursor;

    #[test]
    fn secondary_unit_rescues_an_unsupported_primary() {
        let report = ClassificationImporter::default().import(vec![
            ClassificationRow::new("Balcony Railing", 96.0, "M").with_secondary(315.0, "LF"),
        ]);

        let field = &report.mapped[0];
        assert_eq!(field.bucket, Some(Bucket::BalconyRailingLf));
        assert_eq!(field.target, IntentTarget::bid_line(BALCONIES, "Railing LF"));
        assert_eq!(field.value, 315.0);
        assert!(field.explanation.contains("secondary unit LF"));
    }

    #[test]
    fn primary_failure_is_reported_when_both_pairs_fail() {
        let report = ClassificationImporter::default().import(vec![
            ClassificationRow::new("Chain Link Fence LF", 400.0, "SQM").with_secondary(12.0, "EA"),
        ]);

        let field = &report.unmapped[0];
        assert_eq!(field.reason, UnmappedReason::UnsupportedUom);
        assert_eq!(field.value, Some(400.0));
        assert_eq!(field.item_key, "unknown|chain_link_fence|0");
    }

    #[test]
    fn rule_misses_carry_suggested_tokens() {
        let report = ClassificationImporter::default()
            .import(vec![ClassificationRow::new("Roof Hatch", 2.0, "EA")]);

        let field = &report.unmapped[0];
        assert_eq!(field.reason, UnmappedReason::UnrecognizedKey);
        assert_eq!(field.suggested_tokens, vec!["roof", "hatch"]);
    }

    #[test]
    fn unreadable_secondary_quantity_still_maps_the_primary_pair() {
        let csv = "Classification,Quantity,Unit,Quantity 2,Unit 2\nSiding,100,SF,n/a,\n";
        let report = ClassificationImporter::default()
            .from_reader(Cursor::new(csv))
            .expect("import succeeds");

        assert!(report.ignored.is_empty());
        let field = &report.mapped[0];
        assert_eq!(field.bucket, Some(Bucket::SidingSf));
        assert_eq!(field.value, 100.0);
    }

    #[test]
    fn csv_rows_feed_the_shared_report() {
        let csv = "Classification,Quantity,Unit,Quantity 2,Unit 2\n\
Chain Link Fence LF,\"1,240\",FT,,\n\
Bollards,14,EA,,\n\
Exterior Soffit,2200,SQM,2200,SF\n\
,5,EA,,\n\
Garage Doors,,EA,,\n\
Siding,lots,SF,,\n";

        let report = ClassificationImporter::default()
            .from_reader(Cursor::new(csv))
            .expect("import succeeds");

        assert_eq!(report.summary.parsed_rows, 6);
        assert_eq!(report.summary.mapped_rows, 3);
        assert_eq!(report.summary.unmapped_rows, 0);
        assert_eq!(report.summary.ignored_rows, 3);

        let fence = report
            .canonical_quantities()
            .into_iter()
            .find(|line| line.section == SITE && line.label == "Fence LF")
            .expect("fence line");
        assert_eq!(fence.quantity, 1240.0);

        let reasons: Vec<IgnoredReason> = report.ignored.iter().map(|row| row.reason).collect();
        assert_eq!(
            reasons,
            vec![
                IgnoredReason::BlankKey,
                IgnoredReason::MissingValue,
                IgnoredReason::NonNumericValue
            ]
        );
    }
}
