use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{CandidateAnalysis, ResumeRecord};
use crate::store::{ResumeStore, StoreError};

/// Process-local store for development and tests. Records are kept in
/// insertion order.
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    records: Mutex<Vec<ResumeRecord>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ResumeRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn find_by_owner_and_digest(
        &self,
        owner_id: &str,
        digest: &str,
    ) -> Result<Option<ResumeRecord>, StoreError> {
        Ok(self
            .lock()
            .iter()
            .find(|r| r.owner_id == owner_id && r.content_digest == digest)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeRecord>, StoreError> {
        Ok(self.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn save(&self, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        let mut records = self.lock();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Backend(format!("resume {} already exists", record.id)));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update_analysis(
        &self,
        id: &str,
        analysis: CandidateAnalysis,
        updated_at: DateTime<Utc>,
    ) -> Result<ResumeRecord, StoreError> {
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.analysis = analysis;
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        Ok(self
            .lock()
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ResumeRecord>, StoreError> {
        Ok(self.lock().iter().rev().cloned().collect())
    }
}
