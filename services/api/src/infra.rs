use bid_intake::config::AppConfig;
use bid_intake::workflows::classification::ClassificationImporter;
use bid_intake::workflows::fields::{
    CustomMappingSnapshot, CustomMappingStore, CustomMappingTable, FieldImporter,
    MappingStoreError,
};
use bid_intake::workflows::qa::{QaBatch, QaRepository, QaReviewService, RepositoryError};
use bid_intake::workflows::taxonomy::IntentTarget;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the import routes share across requests.
pub(crate) struct IntakeContext {
    pub(crate) fields: FieldImporter,
    pub(crate) classifications: ClassificationImporter,
    pub(crate) mappings: Arc<InMemoryMappingStore>,
    pub(crate) qa: Arc<QaReviewService<InMemoryQaRepository>>,
}

impl IntakeContext {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self::new(
            FieldImporter::new(config.resolution.into(), config.report.into()),
            ClassificationImporter::new(config.report.into()),
        )
    }

    pub(crate) fn new(fields: FieldImporter, classifications: ClassificationImporter) -> Self {
        let repository = Arc::new(InMemoryQaRepository::default());
        Self {
            fields,
            classifications,
            mappings: Arc::new(InMemoryMappingStore::default()),
            qa: Arc::new(QaReviewService::new(repository)),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryQaRepository {
    batches: Arc<Mutex<HashMap<String, QaBatch>>>,
}

impl InMemoryQaRepository {
    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, QaBatch>>, RepositoryError> {
        self.batches
            .lock()
            .map_err(|_| RepositoryError::Unavailable("batch store poisoned".to_string()))
    }
}

impl QaRepository for InMemoryQaRepository {
    fn insert(&self, batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&batch.batch_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(batch.batch_id.clone(), batch.clone());
        Ok(batch)
    }

    fn update(&self, mut batch: QaBatch) -> Result<QaBatch, RepositoryError> {
        let mut guard = self.guard()?;
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
        Ok(self.guard()?.get(batch_id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryMappingStore {
    table: Arc<Mutex<CustomMappingTable>>,
}

impl InMemoryMappingStore {
    fn guard(&self) -> Result<std::sync::MutexGuard<'_, CustomMappingTable>, MappingStoreError> {
        self.table
            .lock()
            .map_err(|_| MappingStoreError::Unavailable("mapping store poisoned".to_string()))
    }
}

impl CustomMappingStore for InMemoryMappingStore {
    fn snapshot(&self) -> Result<CustomMappingSnapshot, MappingStoreError> {
        Ok(self.guard()?.snapshot())
    }

    fn confirm(
        &self,
        raw_key: &str,
        target: IntentTarget,
        created_at: DateTime<Utc>,
    ) -> Result<String, MappingStoreError> {
        self.guard()?
            .insert(raw_key, target, created_at)
            .ok_or_else(|| MappingStoreError::EmptyKey(raw_key.to_string()))
    }

    fn list(&self) -> Result<CustomMappingTable, MappingStoreError> {
        Ok(self.guard()?.clone())
    }
}
