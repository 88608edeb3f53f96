use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::analysis::CandidateAnalysis;

/// One accepted resume upload.
///
/// Serialized with the admin API's document keys so the same type travels
/// over the wire to the remote store and back out of this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "user_id", alias = "owner_id")]
    pub owner_id: String,
    pub filename: String,
    #[serde(rename = "filelink", alias = "file_link")]
    pub file_link: String,
    #[serde(rename = "fileHash", alias = "content_digest")]
    pub content_digest: String,
    #[serde(default)]
    pub analysis: CandidateAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(rename = "uploaded_at", alias = "created_at")]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the `resumes` table.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: String,
    pub owner_id: String,
    pub filename: String,
    pub file_link: String,
    pub content_digest: String,
    pub analysis: Json<CandidateAnalysis>,
    pub vendor_id: Option<String>,
    pub vendor_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeRecord {
    fn from(row: ResumeRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            filename: row.filename,
            file_link: row.file_link,
            content_digest: row.content_digest,
            analysis: row.analysis.0,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
