use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use crate::models::{CandidateAnalysis, ResumeRecord, ResumeRow};
use crate::store::{ResumeStore, StoreError};

const CREATE_RESUMES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS resumes (
    id             TEXT PRIMARY KEY,
    owner_id       TEXT NOT NULL,
    filename       TEXT NOT NULL,
    file_link      TEXT NOT NULL,
    content_digest TEXT NOT NULL,
    analysis       JSONB NOT NULL,
    vendor_id      TEXT,
    vendor_name    TEXT,
    created_at     TIMESTAMPTZ NOT NULL,
    updated_at     TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_OWNER_DIGEST_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS resumes_owner_digest_idx ON resumes (owner_id, content_digest)";

/// Postgres-backed store over the `resumes` table.
#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url` and makes sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the table and lookup index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_RESUMES_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_OWNER_DIGEST_INDEX)
            .execute(&self.pool)
            .await?;
        info!("resumes table ready");
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn find_by_owner_and_digest(
        &self,
        owner_id: &str,
        digest: &str,
    ) -> Result<Option<ResumeRecord>, StoreError> {
        let row: Option<ResumeRow> = sqlx::query_as(
            "SELECT * FROM resumes WHERE owner_id = $1 AND content_digest = $2 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(owner_id)
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ResumeRecord::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeRecord>, StoreError> {
        let row: Option<ResumeRow> = sqlx::query_as("SELECT * FROM resumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ResumeRecord::from))
    }

    async fn save(&self, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        let row: ResumeRow = sqlx::query_as(
            r#"
            INSERT INTO resumes
                (id, owner_id, filename, file_link, content_digest, analysis,
                 vendor_id, vendor_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner_id)
        .bind(&record.filename)
        .bind(&record.file_link)
        .bind(&record.content_digest)
        .bind(Json(&record.analysis))
        .bind(&record.vendor_id)
        .bind(&record.vendor_name)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted resume {} for owner {}", row.id, row.owner_id);
        Ok(row.into())
    }

    async fn update_analysis(
        &self,
        id: &str,
        analysis: CandidateAnalysis,
        updated_at: DateTime<Utc>,
    ) -> Result<ResumeRecord, StoreError> {
        let row: Option<ResumeRow> = sqlx::query_as(
            "UPDATE resumes SET analysis = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(Json(&analysis))
        .bind(updated_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ResumeRecord::from)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        let rows: Vec<ResumeRow> =
            sqlx::query_as("SELECT * FROM resumes WHERE owner_id = $1 ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(ResumeRecord::from).collect())
    }

    async fn list_all(&self) -> Result<Vec<ResumeRecord>, StoreError> {
        let rows: Vec<ResumeRow> = sqlx::query_as("SELECT * FROM resumes ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ResumeRecord::from).collect())
    }
}
