use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::body::to_bytes;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::fields::{CustomMappingSnapshot, FieldImporter, RawField};
use crate::workflows::qa::repository::{QaBatch, QaRepository, RepositoryError};
use crate::workflows::qa::QaReviewService;
use crate::workflows::report::ImportReport;

pub(super) const AMBIGUOUS_ROW: usize = 0;
pub(super) const SIGNAGE_ROW: usize = 1;
pub(super) const ROOF_ROW: usize = 2;
pub(super) const VALUELESS_ROW: usize = 3;

/// Four unmapped items with different suggestion shapes plus one mapped row.
pub(super) fn review_report() -> ImportReport {
    FieldImporter::default().import(
        vec![
            RawField::new("Unit Corridor Wall SF", Some(300.0)),
            RawField::new("Site Signage", Some(6.0)),
            RawField::new("Roof Area", Some(900.0)).with_section("Roof"),
            RawField::new("Unit Wall SF", None),
            RawField::new("Total Units", Some(180.0)),
        ],
        &CustomMappingSnapshot::empty(),
    )
}

pub(super) fn key_for_row(report: &ImportReport, row_index: usize) -> String {
    report
        .unmapped
        .iter()
        .find(|item| item.row_index == row_index)
        .map(|item| item.item_key.clone())
        .expect("row is unmapped")
}

pub(super) fn build_service() -> (QaReviewService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = QaReviewService::new(repository.clone());
    (service, repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json body")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) batches: Arc<Mutex<HashMap<String, QaBatch>>>,
}

impl QaRepository for MemoryRepository {
    fn insert(&self, batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        let mut guard = self.batches.lock().expect("repository mutex poisoned");
        if guard.contains_key(&batch.batch_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(batch.batch_id.clone(), batch.clone());
        Ok(batch)
    }

    fn update(&self, mut batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        let mut guard = self.batches.lock().expect("repository mutex poisoned");
        let stored = guard
            .get_mut(&batch.batch_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != batch.version {
            return Err(RepositoryError::Conflict);
        }
        batch.version += 1;
        *stored = batch.clone();
        Ok(batch)
    }

    fn fetch(&self, batch_id: &str) -> Result<Option<QaBatch>, RepositoryError> {
        let guard = self.batches.lock().expect("repository mutex poisoned");
        Ok(guard.get(batch_id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl QaRepository for UnavailableRepository {
    fn insert(&self, _batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _batch_id: &str) -> Result<Option<QaBatch>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Holds every read long enough for concurrent writers to interleave.
#[derive(Default)]
pub(super) struct SlowReadRepository {
    inner: MemoryRepository,
}

impl QaRepository for SlowReadRepository {
    fn insert(&self, batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        self.inner.insert(batch)
    }

    fn update(&self, batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        self.inner.update(batch)
    }

    fn fetch(&self, batch_id: &str) -> Result<Option<QaBatch>, RepositoryError> {
        let batch = self.inner.fetch(batch_id);
        thread::sleep(Duration::from_millis(20));
        batch
    }
}
