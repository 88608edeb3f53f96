use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::client::{ApiClient, ClientError};
use crate::models::{CandidateAnalysis, ResumeRecord};
use crate::store::{ResumeStore, StoreError};

/// Store backed by the admin API's `/resumes` endpoints.
#[derive(Clone)]
pub struct RemoteResumeStore {
    api: ApiClient,
}

impl RemoteResumeStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

fn not_found_as(id: &str, err: ClientError) -> StoreError {
    match err.status() {
        Some(404) => StoreError::NotFound(id.to_string()),
        _ => StoreError::Client(err),
    }
}

#[async_trait]
impl ResumeStore for RemoteResumeStore {
    async fn find_by_owner_and_digest(
        &self,
        owner_id: &str,
        digest: &str,
    ) -> Result<Option<ResumeRecord>, StoreError> {
        Ok(self.api.check_duplicate(digest, owner_id).await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeRecord>, StoreError> {
        match self.api.get_resume(id).await {
            Ok(record) => Ok(Some(record)),
            Err(err) if err.status() == Some(404) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        Ok(self.api.save_resume(&record).await?)
    }

    /// The API stamps `updated_at` itself.
    async fn update_analysis(
        &self,
        id: &str,
        analysis: CandidateAnalysis,
        _updated_at: DateTime<Utc>,
    ) -> Result<ResumeRecord, StoreError> {
        self.api
            .update_resume_analysis(id, &analysis)
            .await
            .map_err(|e| not_found_as(id, e))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        self.api
            .delete_resume(id)
            .await
            .map_err(|e| not_found_as(id, e))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        Ok(self.api.list_resumes(owner_id).await?)
    }

    async fn list_all(&self) -> Result<Vec<ResumeRecord>, StoreError> {
        Ok(self.api.list_all_resumes().await?)
    }
}
