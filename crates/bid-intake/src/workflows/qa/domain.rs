use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::report::{ImportReport, UnmappedField};
use crate::workflows::taxonomy::IntentTarget;

/// Human decision recorded against an unmapped item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaAction {
    Map,
    Ignore,
    CreateLine,
}

impl QaAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Ignore => "ignore",
            Self::CreateLine => "create_line",
        }
    }
}

/// Body of a single resolve call. `mapped_to` is optional for `map` and
/// `create_line`; each falls back to the item's own suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub action: QaAction,
    #[serde(default)]
    pub mapped_to: Option<IntentTarget>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ResolveRequest {
    pub fn new(action: QaAction) -> Self {
        Self {
            action,
            mapped_to: None,
            note: None,
        }
    }

    pub fn with_target(mut self, target: IntentTarget) -> Self {
        self.mapped_to = Some(target);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaDecision {
    pub action: QaAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_to: Option<IntentTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub item_key: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub resolved: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QaError {
    #[error("item '{0}' is not an unmapped item of this import")]
    UnknownItem(String),
    #[error("item '{0}' has no resolution to undo")]
    NotResolved(String),
    #[error("item '{0}' has no suggestion to map to; supply a target")]
    MissingTarget(String),
    #[error("action '{}' cannot use target {target}", .action.label())]
    TargetKindMismatch { action: QaAction, target: IntentTarget },
}

/// Per-batch QA ledger. Entries are keyed by [`UnmappedField::item_key`]
/// and are only meaningful against the report that produced those keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaResolution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolved: BTreeMap<String, QaDecision>,
}

impl QaResolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }

    /// Marks the whole batch as reviewed. Residual unresolved items stay
    /// unresolved; acknowledgement only lifts the progression gate.
    pub fn acknowledge(&mut self, at: DateTime<Utc>) {
        self.acknowledged_at = Some(at);
    }

    pub fn decision(&self, item_key: &str) -> Option<&QaDecision> {
        self.resolved.get(item_key)
    }

    pub fn resolve(
        &mut self,
        report: &ImportReport,
        item_key: &str,
        request: ResolveRequest,
        decided_at: DateTime<Utc>,
    ) -> Result<QaDecision, QaError> {
        let item = report
            .unmapped_item(item_key)
            .ok_or_else(|| QaError::UnknownItem(item_key.to_string()))?;
        let mapped_to = decision_target(item, request.action, request.mapped_to)?;

        let decision = QaDecision {
            action: request.action,
            mapped_to,
            note: request.note.filter(|note| !note.trim().is_empty()),
            decided_at,
        };
        self.resolved.insert(item_key.to_string(), decision.clone());
        Ok(decision)
    }

    /// Drops the decision for an item. The report entry, suggestions
    /// included, is never touched, so the item simply becomes unresolved.
    pub fn undo(&mut self, item_key: &str) -> Option<QaDecision> {
        self.resolved.remove(item_key)
    }

    /// Applies one action to many items. For `map` each item takes its own
    /// top suggestion; items that cannot be resolved are skipped, not fatal.
    pub fn batch_resolve<'a, I>(
        &mut self,
        report: &ImportReport,
        item_keys: I,
        action: QaAction,
        decided_at: DateTime<Utc>,
    ) -> BatchOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut outcome = BatchOutcome::default();
        for item_key in item_keys {
            match self.resolve(report, item_key, ResolveRequest::new(action), decided_at) {
                Ok(_) => outcome.resolved.push(item_key.to_string()),
                Err(error) => outcome.skipped.push(SkippedItem {
                    item_key: item_key.to_string(),
                    error: error.to_string(),
                }),
            }
        }
        outcome
    }

    pub fn unresolved<'r>(&self, report: &'r ImportReport) -> Vec<&'r UnmappedField> {
        report
            .unmapped
            .iter()
            .filter(|item| !self.resolved.contains_key(&item.item_key))
            .collect()
    }

    pub fn unresolved_count(&self, report: &ImportReport) -> usize {
        report
            .unmapped
            .iter()
            .filter(|item| !self.resolved.contains_key(&item.item_key))
            .count()
    }

    /// Re-bases the ledger on a re-imported `report`. Decisions whose item
    /// key no longer appears are removed and returned. An acknowledgement
    /// covered the previous report only, so it is withdrawn.
    pub fn reconcile(&mut self, report: &ImportReport) -> Vec<String> {
        self.acknowledged_at = None;
        let stale: Vec<String> = self
            .resolved
            .keys()
            .filter(|key| report.unmapped_item(key).is_none())
            .cloned()
            .collect();
        for key in &stale {
            self.resolved.remove(key);
        }
        stale
    }
}

fn decision_target(
    item: &UnmappedField,
    action: QaAction,
    requested: Option<IntentTarget>,
) -> Result<Option<IntentTarget>, QaError> {
    match (action, requested) {
        (QaAction::Ignore, None) => Ok(None),
        (QaAction::Map, Some(target)) if target.is_existing_line() => Ok(Some(target)),
        (QaAction::CreateLine, Some(target)) if !target.is_existing_line() => Ok(Some(target)),
        (action, Some(target)) => Err(QaError::TargetKindMismatch { action, target }),
        (QaAction::Map, None) => item
            .suggestions
            .iter()
            .map(|suggestion| &suggestion.target)
            .find(|target| target.is_existing_line())
            .cloned()
            .map(Some)
            .ok_or_else(|| QaError::MissingTarget(item.item_key.clone())),
        (QaAction::CreateLine, None) => {
            let suggested = item
                .suggestions
                .iter()
                .map(|suggestion| &suggestion.target)
                .find(|target| !target.is_existing_line())
                .cloned();
            Ok(Some(suggested.unwrap_or_else(|| {
                IntentTarget::create_line(
                    item.section_guess.as_deref().unwrap_or("unknown"),
                    item.raw_key.trim(),
                )
            })))
        }
    }
}
