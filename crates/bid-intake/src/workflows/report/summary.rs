use super::confidence::{confidence_tier, missing_requirements, ReportPolicy};
use super::views::{
    IgnoredRow, ImportSummary, MappedField, MissingRequirement, QuantityLine, UnmappedField,
};
use crate::workflows::taxonomy::IntentTarget;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one import batch. Derived from the rows alone; recomputed on
/// every import rather than edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub mapped: Vec<MappedField>,
    pub unmapped: Vec<UnmappedField>,
    pub ignored: Vec<IgnoredRow>,
    pub missing_requirements: Vec<MissingRequirement>,
}

impl ImportReport {
    pub fn build(
        mapped: Vec<MappedField>,
        unmapped: Vec<UnmappedField>,
        ignored: Vec<IgnoredRow>,
        policy: ReportPolicy,
    ) -> Self {
        let missing_requirements = missing_requirements(mapped.iter().map(|field| &field.target));
        let confidence = confidence_tier(unmapped.len(), missing_requirements.len(), policy);

        let summary = ImportSummary {
            parsed_rows: mapped.len() + unmapped.len() + ignored.len(),
            mapped_rows: mapped.len(),
            unmapped_rows: unmapped.len(),
            ignored_rows: ignored.len(),
            confidence,
        };

        Self {
            summary,
            mapped,
            unmapped,
            ignored,
            missing_requirements,
        }
    }

    pub fn unmapped_item(&self, item_key: &str) -> Option<&UnmappedField> {
        self.unmapped.iter().find(|field| field.item_key == item_key)
    }

    pub fn item_keys(&self) -> impl Iterator<Item = &str> {
        self.unmapped.iter().map(|field| field.item_key.as_str())
    }

    /// Mapped quantities summed per existing bid line, ordered by section
    /// then label.
    pub fn canonical_quantities(&self) -> Vec<QuantityLine> {
        self.quantities_where(|target| matches!(target, IntentTarget::BidLine { .. }))
    }

    pub fn alternate_quantities(&self) -> Vec<QuantityLine> {
        self.quantities_where(|target| matches!(target, IntentTarget::AlternateLine { .. }))
    }

    fn quantities_where(&self, include: impl Fn(&IntentTarget) -> bool) -> Vec<QuantityLine> {
        let mut totals: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
        for field in self.mapped.iter().filter(|field| include(&field.target)) {
            let entry = totals
                .entry((field.target.section(), field.target.label()))
                .or_insert((0.0, 0));
            entry.0 += field.value;
            entry.1 += 1;
        }

        totals
            .into_iter()
            .map(|((section, label), (quantity, source_rows))| QuantityLine {
                section: section.to_string(),
                label: label.to_string(),
                quantity,
                source_rows,
            })
            .collect()
    }
}

/// Accumulates row outcomes in input order and freezes them into a report.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    policy: ReportPolicy,
    mapped: Vec<MappedField>,
    unmapped: Vec<UnmappedField>,
    ignored: Vec<IgnoredRow>,
}

impl ReportBuilder {
    pub fn new(policy: ReportPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn mapped(&mut self, field: MappedField) {
        self.mapped.push(field);
    }

    pub fn unmapped(&mut self, field: UnmappedField) {
        self.unmapped.push(field);
    }

    pub fn ignored(&mut self, row: IgnoredRow) {
        self.ignored.push(row);
    }

    pub fn finish(self) -> ImportReport {
        ImportReport::build(self.mapped, self.unmapped, self.ignored, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::report::views::{
        item_key, ConfidenceTier, IgnoredReason, UnmappedReason,
    };
    use crate::workflows::taxonomy::{CORRIDORS, EXTERIOR, STAIRS, UNITS};
    use crate::workflows::units::UnitKind;

    fn mapped(row_index: usize, target: IntentTarget, value: f64) -> MappedField {
        MappedField {
            row_index,
            raw_key: format!("row {row_index}"),
            normalized_key: format!("row {row_index}"),
            value,
            unit_kind: UnitKind::Sf,
            target,
            rule_id: "test".to_string(),
            bucket: None,
            explanation: String::new(),
        }
    }

    fn unmapped(row_index: usize) -> UnmappedField {
        UnmappedField {
            item_key: item_key(None, "roof area", row_index),
            row_index,
            raw_key: "Roof Area".to_string(),
            normalized_key: "roof area".to_string(),
            section_guess: None,
            value: Some(10.0),
            unit_kind: UnitKind::Count,
            reason: UnmappedReason::UnrecognizedKey,
            explanation: "no rule matched".to_string(),
            suggestions: Vec::new(),
            suggested_tokens: Vec::new(),
        }
    }

    fn anchored() -> Vec<MappedField> {
        vec![
            mapped(0, IntentTarget::bid_line(UNITS, "Wall SF"), 1000.0),
            mapped(1, IntentTarget::bid_line(UNITS, "Count"), 24.0),
            mapped(2, IntentTarget::bid_line(CORRIDORS, "Wall SF"), 400.0),
            mapped(3, IntentTarget::bid_line(EXTERIOR, "Siding SF"), 900.0),
            mapped(4, IntentTarget::bid_line(STAIRS, "Levels"), 4.0),
        ]
    }

    #[test]
    fn counts_partition_parsed_rows() {
        let ignored = vec![IgnoredRow {
            row_index: 7,
            raw_key: String::new(),
            reason: IgnoredReason::BlankKey,
            detail: "blank key".to_string(),
        }];
        let report = ImportReport::build(
            anchored(),
            vec![unmapped(5), unmapped(6)],
            ignored,
            ReportPolicy::default(),
        );

        let summary = report.summary;
        assert_eq!(summary.parsed_rows, 8);
        assert_eq!(
            summary.mapped_rows + summary.unmapped_rows + summary.ignored_rows,
            summary.parsed_rows
        );
    }

    #[test]
    fn all_anchors_and_nothing_unmapped_is_high() {
        let report =
            ImportReport::build(anchored(), Vec::new(), Vec::new(), ReportPolicy::default());
        assert_eq!(report.summary.confidence, ConfidenceTier::High);
        assert!(report.missing_requirements.is_empty());
    }

    #[test]
    fn six_unmapped_rows_are_low_even_with_all_anchors() {
        let unmapped_rows = (5..11).map(unmapped).collect();
        let report =
            ImportReport::build(anchored(), unmapped_rows, Vec::new(), ReportPolicy::default());
        assert_eq!(report.summary.confidence, ConfidenceTier::Low);
    }

    #[test]
    fn one_missing_anchor_is_medium() {
        let mut fields = anchored();
        fields.retain(|field| field.target != IntentTarget::bid_line(CORRIDORS, "Wall SF"));

        let report = ImportReport::build(
            fields,
            (5..10).map(unmapped).collect(),
            Vec::new(),
            ReportPolicy::default(),
        );
        assert_eq!(report.summary.confidence, ConfidenceTier::Medium);
        assert_eq!(report.missing_requirements.len(), 1);
    }

    #[test]
    fn identical_inputs_build_identical_reports() {
        let build = || {
            ImportReport::build(
                anchored(),
                vec![unmapped(9)],
                Vec::new(),
                ReportPolicy::default(),
            )
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn canonical_quantities_sum_per_line_and_skip_alternates() {
        let mut fields = anchored();
        fields.push(mapped(8, IntentTarget::bid_line(UNITS, "Wall SF"), 250.0));
        fields.push(mapped(
            9,
            IntentTarget::alternate_line(UNITS, "Accent Wall SF"),
            80.0,
        ));

        let report = ImportReport::build(fields, Vec::new(), Vec::new(), ReportPolicy::default());
        let quantities = report.canonical_quantities();

        let unit_walls = quantities
            .iter()
            .find(|line| line.section == UNITS && line.label == "Wall SF")
            .expect("unit walls present");
        assert_eq!(unit_walls.quantity, 1250.0);
        assert_eq!(unit_walls.source_rows, 2);
        assert!(quantities.iter().all(|line| line.label != "Accent Wall SF"));

        let alternates = report.alternate_quantities();
        assert_eq!(alternates.len(), 1);
        assert_eq!(alternates[0].quantity, 80.0);
    }

    #[test]
    fn builder_preserves_input_order() {
        let mut builder = ReportBuilder::new(ReportPolicy::default());
        builder.unmapped(unmapped(3));
        builder.unmapped(unmapped(1));
        let report = builder.finish();

        let rows: Vec<usize> = report.unmapped.iter().map(|field| field.row_index).collect();
        assert_eq!(rows, vec![3, 1]);
        assert!(report.unmapped_item("unknown|roof area|1").is_some());
        assert_eq!(report.item_keys().count(), 2);
    }
}
