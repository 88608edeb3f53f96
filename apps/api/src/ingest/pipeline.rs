use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::RequestCoalescer;
use crate::ingest::normalize::normalize_analysis;
use crate::ingest::prompts::RESUME_EXTRACTION_PROMPT;
use crate::ingest::storage::DocumentStorage;
use crate::ingest::{hasher, Extractor, IngestError, MediaType};
use crate::models::{CandidateAnalysis, ResumeRecord};
use crate::store::{ResumeStore, StoreError};

/// One uploaded document and who it belongs to.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner_id: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub vendor_id: Option<String>,
    pub vendor_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub analysis: CandidateAnalysis,
    pub record: ResumeRecord,
    /// Nothing was created for this caller: the document was already on
    /// file, or an identical upload in progress created it.
    pub duplicate: bool,
}

/// (owner_id, content digest)
type IngestKey = (String, String);

/// Hash → duplicate check → extract → normalize → persist.
///
/// Concurrent uploads of the same bytes for the same owner within this
/// process share one run and receive the same outcome. Separate processes
/// are not coordinated.
#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn ResumeStore>,
    extractor: Arc<dyn Extractor>,
    storage: Arc<dyn DocumentStorage>,
    in_flight: RequestCoalescer<IngestKey, IngestOutcome, IngestError>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        extractor: Arc<dyn Extractor>,
        storage: Arc<dyn DocumentStorage>,
    ) -> Self {
        Self {
            store,
            extractor,
            storage,
            in_flight: RequestCoalescer::new(),
        }
    }

    /// Number of ingestions currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.in_flight()
    }

    pub async fn ingest(&self, upload: UploadRequest) -> Result<IngestOutcome, IngestError> {
        if upload.owner_id.trim().is_empty() {
            return Err(IngestError::InvalidInput("owner_id is required".into()));
        }
        if upload.bytes.is_empty() {
            return Err(IngestError::InvalidInput(format!(
                "'{}' is empty",
                upload.filename
            )));
        }
        let media_type =
            MediaType::detect(upload.content_type.as_deref(), &upload.filename, &upload.bytes)?;
        let digest = hasher::digest(&upload.bytes);

        let key = (upload.owner_id.clone(), digest.clone());
        let pipeline = self.clone();
        let mut started_here = false;
        let started = &mut started_here;
        let mut outcome = self
            .in_flight
            .execute(key, move || {
                *started = true;
                async move { pipeline.run(upload, media_type, digest).await }
            })
            .await?;

        // A caller that attached to someone else's run created nothing.
        if !started_here && !outcome.duplicate {
            info!(
                "Upload for owner {} joined an in-flight ingestion of resume {}",
                outcome.record.owner_id, outcome.record.id
            );
            outcome.duplicate = true;
        }
        Ok(outcome)
    }

    async fn run(
        &self,
        upload: UploadRequest,
        media_type: MediaType,
        digest: String,
    ) -> Result<IngestOutcome, IngestError> {
        if let Some(existing) = self
            .store
            .find_by_owner_and_digest(&upload.owner_id, &digest)
            .await?
        {
            info!(
                "Duplicate upload of {} for owner {}; reusing resume {}",
                upload.filename, upload.owner_id, existing.id
            );
            return Ok(IngestOutcome {
                analysis: existing.analysis.clone(),
                record: existing,
                duplicate: true,
            });
        }

        let raw = self
            .extractor
            .extract(&upload.bytes, media_type, RESUME_EXTRACTION_PROMPT)
            .await?;
        let analysis = normalize_analysis(&raw)?;

        let file_link = self
            .storage
            .put(&upload.owner_id, &digest, media_type, upload.bytes.clone())
            .await?;

        let now = Utc::now();
        let record = ResumeRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: upload.owner_id,
            filename: upload.filename,
            file_link,
            content_digest: digest,
            analysis: analysis.clone(),
            vendor_id: upload.vendor_id,
            vendor_name: upload.vendor_name,
            created_at: now,
            updated_at: now,
        };
        let record = self.store.save(record).await?;
        info!(
            "Stored resume {} for owner {} ({})",
            record.id, record.owner_id, record.content_digest
        );

        Ok(IngestOutcome {
            analysis,
            record,
            duplicate: false,
        })
    }

    /// Re-runs extraction for an existing resume; only `analysis` and
    /// `updated_at` change. A format failure leaves the record untouched.
    pub async fn reanalyze(&self, id: &str, bytes: Bytes) -> Result<ResumeRecord, IngestError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if hasher::digest(&bytes) != existing.content_digest {
            warn!("Re-analysing resume {id} with bytes that differ from the stored digest");
        }
        let media_type = MediaType::detect(None, &existing.filename, &bytes)?;
        let raw = self
            .extractor
            .extract(&bytes, media_type, RESUME_EXTRACTION_PROMPT)
            .await?;
        let analysis = normalize_analysis(&raw)?;

        Ok(self.store.update_analysis(id, analysis, Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::future::join_all;

    use crate::ingest::DigestLinkStorage;
    use crate::store::MemoryResumeStore;
    use crate::test_support::{FailingStore, StubExtractor, PDF_BYTES};

    const ANALYSIS_JSON: &str = r#"```json
{"name": "Ada Lovelace", "key_skills": ["Rust", "Analysis"], "education_details": []}
```"#;

    fn pipeline(extractor: Arc<StubExtractor>, store: Arc<MemoryResumeStore>) -> IngestionPipeline {
        IngestionPipeline::new(store, extractor, Arc::new(DigestLinkStorage))
    }

    fn upload(owner: &str, bytes: &'static [u8]) -> UploadRequest {
        UploadRequest {
            owner_id: owner.into(),
            filename: "ada.pdf".into(),
            content_type: Some("application/pdf".into()),
            bytes: Bytes::from_static(bytes),
            vendor_id: Some("v1".into()),
            vendor_name: Some("Acme Staffing".into()),
        }
    }

    #[tokio::test]
    async fn test_new_upload_is_extracted_and_persisted() {
        let extractor = Arc::new(StubExtractor::replying(ANALYSIS_JSON));
        let store = Arc::new(MemoryResumeStore::new());
        let outcome = pipeline(extractor.clone(), store.clone())
            .ingest(upload("U1", PDF_BYTES))
            .await
            .unwrap();

        assert!(!outcome.duplicate);
        assert_eq!(outcome.analysis.name, "Ada Lovelace");
        assert_eq!(outcome.analysis.skills, vec!["Rust", "Analysis"]);
        assert_eq!(outcome.record.content_digest, hasher::digest(PDF_BYTES));
        assert_eq!(outcome.record.analysis, outcome.analysis);
        assert_eq!(outcome.record.vendor_name.as_deref(), Some("Acme Staffing"));
        assert_eq!(
            outcome.record.file_link,
            format!("digest://U1/{}", outcome.record.content_digest)
        );
        assert_eq!(extractor.calls(), 1);
        assert_eq!(extractor.last_media_type(), Some(MediaType::Pdf));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_upload_skips_extractor() {
        let extractor = Arc::new(StubExtractor::replying(ANALYSIS_JSON));
        let store = Arc::new(MemoryResumeStore::new());
        let pipeline = pipeline(extractor.clone(), store.clone());

        let first = pipeline.ingest(upload("U1", PDF_BYTES)).await.unwrap();
        let second = pipeline.ingest(upload("U1", PDF_BYTES)).await.unwrap();

        assert_eq!(extractor.calls(), 1);
        assert!(second.duplicate);
        assert_eq!(second.record, first.record);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_same_bytes_for_another_owner_is_not_a_duplicate() {
        let extractor = Arc::new(StubExtractor::replying(ANALYSIS_JSON));
        let store = Arc::new(MemoryResumeStore::new());
        let pipeline = pipeline(extractor.clone(), store.clone());

        pipeline.ingest(upload("U1", PDF_BYTES)).await.unwrap();
        let other = pipeline.ingest(upload("U2", PDF_BYTES)).await.unwrap();

        assert!(!other.duplicate);
        assert_eq!(extractor.calls(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_uploads_share_one_extraction() {
        let extractor =
            Arc::new(StubExtractor::replying(ANALYSIS_JSON).with_delay(Duration::from_millis(50)));
        let store = Arc::new(MemoryResumeStore::new());
        let pipeline = pipeline(extractor.clone(), store.clone());

        let outcomes = join_all((0..2).map(|_| pipeline.ingest(upload("U1", PDF_BYTES)))).await;

        assert_eq!(extractor.calls(), 1);
        assert_eq!(store.len(), 1);
        let outcomes: Vec<_> = outcomes.into_iter().map(Result::unwrap).collect();
        assert_eq!(outcomes[0].record, outcomes[1].record);
        assert_eq!(
            outcomes.iter().filter(|o| !o.duplicate).count(),
            1,
            "only the caller that started the run created the record"
        );
    }

    #[tokio::test]
    async fn test_unparseable_extraction_persists_nothing() {
        let extractor = Arc::new(StubExtractor::replying("Sorry, I can't help with that."));
        let store = Arc::new(MemoryResumeStore::new());

        let err = pipeline(extractor, store.clone())
            .ingest(upload("U1", PDF_BYTES))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::ExtractionFormat(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_thin_extraction_is_accepted() {
        let extractor = Arc::new(StubExtractor::replying("{}"));
        let store = Arc::new(MemoryResumeStore::new());

        let outcome = pipeline(extractor, store)
            .ingest(upload("U1", PDF_BYTES))
            .await
            .unwrap();
        assert_eq!(outcome.analysis, CandidateAnalysis::default());
    }

    #[tokio::test]
    async fn test_empty_file_fails_before_extraction() {
        let extractor = Arc::new(StubExtractor::replying(ANALYSIS_JSON));
        let store = Arc::new(MemoryResumeStore::new());

        let err = pipeline(extractor.clone(), store.clone())
            .ingest(upload("U1", b""))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::InvalidInput(_)));
        assert_eq!(extractor.calls(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_before_extraction() {
        let extractor = Arc::new(StubExtractor::replying(ANALYSIS_JSON));
        let err = pipeline(extractor.clone(), Arc::new(MemoryResumeStore::new()))
            .ingest(upload("U1", b"\x00\x01garbage"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidInput(_)));
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_extractor_failure_is_shared_and_not_persisted() {
        let extractor = Arc::new(StubExtractor::failing(IngestError::Extractor(
            "rate limited".into(),
        )));
        let store = Arc::new(MemoryResumeStore::new());

        let err = pipeline(extractor, store.clone())
            .ingest(upload("U1", PDF_BYTES))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Extractor(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reanalyze_updates_analysis_only() {
        let store = Arc::new(MemoryResumeStore::new());
        let first = pipeline(Arc::new(StubExtractor::replying(ANALYSIS_JSON)), store.clone())
            .ingest(upload("U1", PDF_BYTES))
            .await
            .unwrap();

        let rerun = pipeline(
            Arc::new(StubExtractor::replying(r#"{"name": "Augusta Ada King"}"#)),
            store.clone(),
        );
        let updated = rerun
            .reanalyze(&first.record.id, Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();

        assert_eq!(updated.analysis.name, "Augusta Ada King");
        assert_eq!(updated.id, first.record.id);
        assert_eq!(updated.created_at, first.record.created_at);
        assert_eq!(updated.content_digest, first.record.content_digest);
        assert!(updated.updated_at >= first.record.updated_at);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_reanalyze_unknown_id_is_not_found() {
        let err = pipeline(
            Arc::new(StubExtractor::replying("{}")),
            Arc::new(MemoryResumeStore::new()),
        )
        .reanalyze("missing", Bytes::from_static(PDF_BYTES))
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_duplicate_lookup_surfaces_store_error() {
        let extractor = Arc::new(StubExtractor::replying(ANALYSIS_JSON));
        let store = Arc::new(FailingStore::on_lookup());
        let pipeline =
            IngestionPipeline::new(store.clone(), extractor.clone(), Arc::new(DigestLinkStorage));

        let err = pipeline.ingest(upload("U1", PDF_BYTES)).await.unwrap_err();

        assert!(matches!(err, IngestError::Store(StoreError::Backend(_))));
        assert_eq!(extractor.calls(), 0);
        assert_eq!(store.save_attempts(), 0);
        assert!(store.inner.is_empty());
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_is_shared_and_leaves_nothing_behind() {
        let extractor =
            Arc::new(StubExtractor::replying(ANALYSIS_JSON).with_delay(Duration::from_millis(30)));
        let store = Arc::new(FailingStore::on_save());
        let pipeline =
            IngestionPipeline::new(store.clone(), extractor.clone(), Arc::new(DigestLinkStorage));

        let results = join_all((0..3).map(|_| pipeline.ingest(upload("U1", PDF_BYTES)))).await;

        for result in results {
            assert!(matches!(result, Err(IngestError::Store(StoreError::Backend(_)))));
        }
        assert_eq!(extractor.calls(), 1);
        assert_eq!(store.save_attempts(), 1);
        assert!(store.inner.is_empty());
        assert_eq!(pipeline.in_flight(), 0);

        let retry = pipeline.ingest(upload("U1", PDF_BYTES)).await;
        assert!(retry.is_err());
        assert_eq!(extractor.calls(), 2);
    }
}
