//! Resume persistence behind a narrow interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::client::ClientError;
use crate::models::{CandidateAnalysis, ResumeRecord};

pub mod memory;
pub mod postgres;
pub mod remote;

pub use memory::MemoryResumeStore;
pub use postgres::PgResumeStore;
pub use remote::RemoteResumeStore;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Resume {0} not found")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Persistence for [`ResumeRecord`]s.
///
/// Uniqueness of (owner, digest) is not enforced here; the ingestion pipeline
/// checks for duplicates before saving.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn find_by_owner_and_digest(
        &self,
        owner_id: &str,
        digest: &str,
    ) -> Result<Option<ResumeRecord>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeRecord>, StoreError>;

    async fn save(&self, record: ResumeRecord) -> Result<ResumeRecord, StoreError>;

    /// Replaces `analysis` and `updated_at`; nothing else changes.
    async fn update_analysis(
        &self,
        id: &str,
        analysis: CandidateAnalysis,
        updated_at: DateTime<Utc>,
    ) -> Result<ResumeRecord, StoreError>;

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, StoreError>;

    /// Every record. Callers without elevated rights may see an empty list.
    async fn list_all(&self) -> Result<Vec<ResumeRecord>, StoreError>;
}
