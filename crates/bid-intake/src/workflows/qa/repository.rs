use serde::Serialize;

use super::domain::QaResolution;
use super::gate::GateDecision;
use crate::workflows::report::{ImportReport, ImportSummary, UnmappedField};

/// One import under review together with its QA ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaBatch {
    pub batch_id: String,
    /// Bumped by every successful update; writers must present the version
    /// they read.
    pub version: u64,
    pub report: ImportReport,
    pub resolution: QaResolution,
}

impl QaBatch {
    pub fn gate(&self) -> GateDecision {
        GateDecision::evaluate(&self.report, &self.resolution)
    }

    pub fn view(&self) -> QaBatchView {
        QaBatchView {
            batch_id: self.batch_id.clone(),
            summary: self.report.summary,
            unresolved: self
                .resolution
                .unresolved(&self.report)
                .into_iter()
                .cloned()
                .collect(),
            resolution: self.resolution.clone(),
            gate: self.gate(),
        }
    }
}

/// Storage abstraction so the review service can be exercised in isolation.
pub trait QaRepository: Send + Sync {
    fn insert(&self, batch: QaBatch) -> Result<QaBatch, RepositoryError>;
    /// Replaces the stored batch only while its version still equals
    /// `batch.version`, returning the stored copy with the version bumped.
    /// A stale version is a [`RepositoryError::Conflict`].
    fn update(&self, batch: QaBatch) -> Result<QaBatch, RepositoryError>;
    fn fetch(&self, batch_id: &str) -> Result<Option<QaBatch>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("batch already exists or was changed concurrently")]
    Conflict,
    #[error("batch not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// What the review UI needs for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct QaBatchView {
    pub batch_id: String,
    pub summary: ImportSummary,
    pub unresolved: Vec<UnmappedField>,
    pub resolution: QaResolution,
    pub gate: GateDecision,
}
