use chrono::{TimeZone, Utc};

use super::common::*;
use crate::workflows::qa::{GateDecision, QaAction, QaError, QaResolution, ResolveRequest};
use crate::workflows::taxonomy::{IntentTarget, UNITS};

fn decided_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 2, 14, 30, 0).unwrap()
}

#[test]
fn ignore_then_undo_restores_the_item_untouched() {
    let report = review_report();
    let before = report.clone();
    let key = key_for_row(&report, AMBIGUOUS_ROW);
    let mut resolution = QaResolution::new();

    resolution
        .resolve(&report, &key, ResolveRequest::new(QaAction::Ignore), decided_at())
        .expect("ignore recorded");
    assert_eq!(resolution.unresolved_count(&report), 3);

    let removed = resolution.undo(&key).expect("decision removed");
    assert_eq!(removed.action, QaAction::Ignore);
    assert_eq!(resolution.unresolved_count(&report), 4);
    assert_eq!(report, before);

    let restored = resolution
        .unresolved(&report)
        .into_iter()
        .find(|item| item.item_key == key)
        .expect("item unresolved again");
    assert_eq!(restored.suggestions.len(), 2);
}

#[test]
fn map_defaults_to_the_items_own_top_suggestion() {
    let report = review_report();
    let key = key_for_row(&report, VALUELESS_ROW);
    let mut resolution = QaResolution::new();

    let decision = resolution
        .resolve(&report, &key, ResolveRequest::new(QaAction::Map), decided_at())
        .expect("mapped");
    assert_eq!(decision.mapped_to, Some(IntentTarget::bid_line(UNITS, "Wall SF")));
}

#[test]
fn map_without_an_existing_line_suggestion_needs_a_target() {
    let report = review_report();
    let key = key_for_row(&report, SIGNAGE_ROW);
    let mut resolution = QaResolution::new();

    let error = resolution
        .resolve(&report, &key, ResolveRequest::new(QaAction::Map), decided_at())
        .expect_err("no target");
    assert_eq!(error, QaError::MissingTarget(key.clone()));

    let decision = resolution
        .resolve(
            &report,
            &key,
            ResolveRequest::new(QaAction::Map)
                .with_target(IntentTarget::bid_line(UNITS, "Doors"))
                .with_note("signage priced with doors"),
            decided_at(),
        )
        .expect("explicit target accepted");
    assert_eq!(decision.note.as_deref(), Some("signage priced with doors"));
}

#[test]
fn create_line_falls_back_to_the_raw_key() {
    let report = review_report();
    let key = key_for_row(&report, ROOF_ROW);
    let mut resolution = QaResolution::new();

    let decision = resolution
        .resolve(&report, &key, ResolveRequest::new(QaAction::CreateLine), decided_at())
        .expect("create line");
    assert_eq!(
        decision.mapped_to,
        Some(IntentTarget::create_line("unknown", "Roof Area"))
    );
}

#[test]
fn target_kind_must_fit_the_action() {
    let report = review_report();
    let key = key_for_row(&report, AMBIGUOUS_ROW);
    let mut resolution = QaResolution::new();

    let error = resolution
        .resolve(
            &report,
            &key,
            ResolveRequest::new(QaAction::Map)
                .with_target(IntentTarget::create_line(UNITS, "Trim")),
            decided_at(),
        )
        .expect_err("create-line target rejected for map");
    assert!(matches!(error, QaError::TargetKindMismatch { action: QaAction::Map, .. }));

    let error = resolution
        .resolve(
            &report,
            &key,
            ResolveRequest::new(QaAction::Ignore)
                .with_target(IntentTarget::bid_line(UNITS, "Doors")),
            decided_at(),
        )
        .expect_err("ignore takes no target");
    assert!(matches!(error, QaError::TargetKindMismatch { action: QaAction::Ignore, .. }));
}

#[test]
fn unknown_item_keys_are_rejected() {
    let report = review_report();
    let mut resolution = QaResolution::new();

    let error = resolution
        .resolve(&report, "units|nothing|99", ResolveRequest::new(QaAction::Ignore), decided_at())
        .expect_err("unknown key");
    assert_eq!(error, QaError::UnknownItem("units|nothing|99".to_string()));
    assert!(resolution.resolved.is_empty());
}

#[test]
fn batch_map_gives_each_item_its_own_target() {
    let report = review_report();
    let ambiguous = key_for_row(&report, AMBIGUOUS_ROW);
    let valueless = key_for_row(&report, VALUELESS_ROW);
    let signage = key_for_row(&report, SIGNAGE_ROW);
    let mut resolution = QaResolution::new();

    let outcome = resolution.batch_resolve(
        &report,
        [ambiguous.as_str(), valueless.as_str(), signage.as_str()],
        QaAction::Map,
        decided_at(),
    );

    assert_eq!(outcome.resolved, vec![ambiguous.clone(), valueless.clone()]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].item_key, signage);

    let ambiguous_item = report.unmapped_item(&ambiguous).expect("item");
    assert_eq!(
        resolution.decision(&ambiguous).and_then(|d| d.mapped_to.as_ref()),
        ambiguous_item.top_suggestion().map(|s| &s.target)
    );
    assert_eq!(
        resolution.decision(&valueless).and_then(|d| d.mapped_to.clone()),
        Some(IntentTarget::bid_line(UNITS, "Wall SF"))
    );
}

#[test]
fn reconcile_drops_decisions_for_vanished_items() {
    let report = review_report();
    let signage = key_for_row(&report, SIGNAGE_ROW);
    let mut resolution = QaResolution::new();
    resolution
        .resolve(&report, &signage, ResolveRequest::new(QaAction::Ignore), decided_at())
        .expect("ignored");
    resolution
        .resolved
        .insert("units|stale|7".to_string(), resolution.resolved[&signage].clone());

    let removed = resolution.reconcile(&report);
    assert_eq!(removed, vec!["units|stale|7".to_string()]);
    assert!(resolution.decision(&signage).is_some());
}

#[test]
fn reconcile_withdraws_the_acknowledgement() {
    let report = review_report();
    let mut resolution = QaResolution::new();
    resolution.acknowledge(decided_at());
    assert!(GateDecision::evaluate(&report, &resolution).is_open());

    let removed = resolution.reconcile(&report);
    assert!(removed.is_empty());
    assert!(!resolution.is_acknowledged());
    assert_eq!(
        GateDecision::evaluate(&report, &resolution),
        GateDecision::Blocked { unresolved: 4 }
    );
}

#[test]
fn gate_blocks_until_resolved_or_acknowledged() {
    let report = review_report();
    let mut resolution = QaResolution::new();
    assert_eq!(
        GateDecision::evaluate(&report, &resolution),
        GateDecision::Blocked { unresolved: 4 }
    );

    let key = key_for_row(&report, ROOF_ROW);
    resolution
        .resolve(&report, &key, ResolveRequest::new(QaAction::Ignore), decided_at())
        .expect("ignored");
    resolution.acknowledge(decided_at());
    assert_eq!(
        GateDecision::evaluate(&report, &resolution),
        GateDecision::Open {
            acknowledged: true,
            residual_unresolved: 3,
        }
    );
}

#[test]
fn gate_opens_once_every_item_is_resolved() {
    let report = review_report();
    let mut resolution = QaResolution::new();
    let keys: Vec<String> = report.item_keys().map(str::to_string).collect();
    let outcome = resolution.batch_resolve(
        &report,
        keys.iter().map(String::as_str),
        QaAction::Ignore,
        decided_at(),
    );
    assert!(outcome.skipped.is_empty());

    let gate = GateDecision::evaluate(&report, &resolution);
    assert!(gate.is_open());
    assert_eq!(
        gate,
        GateDecision::Open {
            acknowledged: false,
            residual_unresolved: 0,
        }
    );
}
