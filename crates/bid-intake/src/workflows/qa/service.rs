use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{BatchOutcome, QaAction, QaDecision, QaError, QaResolution, ResolveRequest};
use super::gate::GateDecision;
use super::repository::{QaBatch, QaRepository, RepositoryError};
use crate::workflows::report::ImportReport;

/// Service persisting import reports and the human decisions made on them.
pub struct QaReviewService<R> {
    repository: Arc<R>,
}

static BATCH_SEQUENCE: AtomicU64 = AtomicU64::new(1);

const MAX_UPDATE_ATTEMPTS: u32 = 8;

fn next_batch_id() -> String {
    let id = BATCH_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("batch-{id:06}")
}

impl<R> QaReviewService<R>
where
    R: QaRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Stores a fresh report under a new batch id with an empty ledger.
    pub fn open_batch(&self, report: ImportReport) -> Result<QaBatch, QaServiceError> {
        let batch = QaBatch {
            batch_id: next_batch_id(),
            version: 0,
            report,
            resolution: QaResolution::new(),
        };
        let stored = self.repository.insert(batch)?;
        info!(
            batch_id = %stored.batch_id,
            unmapped = stored.report.summary.unmapped_rows,
            "opened QA batch"
        );
        Ok(stored)
    }

    /// Replaces the report of an existing batch. Decisions whose item keys
    /// are not in the new report are dropped and the acknowledgement is
    /// withdrawn.
    pub fn reimport(
        &self,
        batch_id: &str,
        report: ImportReport,
    ) -> Result<(QaBatch, Vec<String>), QaServiceError> {
        let (batch, (stale, was_acknowledged)) = self.modify(batch_id, |batch| {
            let was_acknowledged = batch.resolution.is_acknowledged();
            batch.report = report.clone();
            let stale = batch.resolution.reconcile(&batch.report);
            Ok((stale, was_acknowledged))
        })?;
        if !stale.is_empty() {
            warn!(
                batch_id,
                dropped = stale.len(),
                "re-import invalidated QA decisions"
            );
        }
        if was_acknowledged {
            warn!(batch_id, "re-import withdrew the batch acknowledgement");
        }
        Ok((batch, stale))
    }

    pub fn get(&self, batch_id: &str) -> Result<QaBatch, QaServiceError> {
        let batch = self
            .repository
            .fetch(batch_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(batch)
    }

    pub fn acknowledge(&self, batch_id: &str) -> Result<QaBatch, QaServiceError> {
        let (batch, ()) = self.modify(batch_id, |batch| {
            batch.resolution.acknowledge(Utc::now());
            Ok(())
        })?;
        info!(
            batch_id,
            residual = batch.resolution.unresolved_count(&batch.report),
            "acknowledged QA batch"
        );
        Ok(batch)
    }

    pub fn resolve(
        &self,
        batch_id: &str,
        item_key: &str,
        request: ResolveRequest,
    ) -> Result<QaDecision, QaServiceError> {
        let (_, decision) = self.modify(batch_id, |batch| {
            batch
                .resolution
                .resolve(&batch.report, item_key, request.clone(), Utc::now())
        })?;
        info!(batch_id, item_key, action = decision.action.label(), "resolved QA item");
        Ok(decision)
    }

    pub fn undo(&self, batch_id: &str, item_key: &str) -> Result<QaDecision, QaServiceError> {
        let (_, removed) = self.modify(batch_id, |batch| {
            batch
                .resolution
                .undo(item_key)
                .ok_or_else(|| QaError::NotResolved(item_key.to_string()))
        })?;
        info!(batch_id, item_key, "undid QA decision");
        Ok(removed)
    }

    pub fn batch_resolve(
        &self,
        batch_id: &str,
        item_keys: &[String],
        action: QaAction,
    ) -> Result<BatchOutcome, QaServiceError> {
        let (_, outcome) = self.modify(batch_id, |batch| {
            Ok(batch.resolution.batch_resolve(
                &batch.report,
                item_keys.iter().map(String::as_str),
                action,
                Utc::now(),
            ))
        })?;
        info!(
            batch_id,
            action = action.label(),
            resolved = outcome.resolved.len(),
            skipped = outcome.skipped.len(),
            "batch-resolved QA items"
        );
        Ok(outcome)
    }

    pub fn gate(&self, batch_id: &str) -> Result<GateDecision, QaServiceError> {
        Ok(self.get(batch_id)?.gate())
    }

    /// Read-modify-write against the versioned repository. A concurrent
    /// writer forces a fresh read and a rerun of `change`.
    fn modify<T, F>(&self, batch_id: &str, mut change: F) -> Result<(QaBatch, T), QaServiceError>
    where
        F: FnMut(&mut QaBatch) -> Result<T, QaError>,
    {
        let mut attempt = 1;
        loop {
            let mut batch = self.get(batch_id)?;
            let value = change(&mut batch)?;
            match self.repository.update(batch) {
                Ok(stored) => return Ok((stored, value)),
                Err(RepositoryError::Conflict) if attempt < MAX_UPDATE_ATTEMPTS => {
                    debug!(batch_id, attempt, "QA batch changed concurrently; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QaServiceError {
    #[error(transparent)]
    Qa(#[from] QaError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
