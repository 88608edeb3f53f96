//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};

use crate::client::{ApiClient, StaticTokenProvider};
use crate::ingest::{Extractor, IngestError, MediaType};
use crate::models::{CandidateAnalysis, ResumeRecord};
use crate::store::{MemoryResumeStore, ResumeStore, StoreError};

/// Serves `router` on an ephemeral port and returns the API base URL
/// (`http://127.0.0.1:<port>/api`). Routes are expected under `/api`.
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{addr}/api")
}

pub fn client_for(base_url: &str, token: Option<&str>) -> ApiClient {
    client_with_provider(
        base_url,
        StaticTokenProvider::new(token.map(String::from), None),
    )
}

pub fn client_with_provider(base_url: &str, provider: StaticTokenProvider) -> ApiClient {
    ApiClient::new(base_url, Arc::new(provider), Some(Duration::from_secs(5)))
        .expect("build api client")
}

pub fn sample_record(id: &str, owner_id: &str, digest: &str) -> ResumeRecord {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    ResumeRecord {
        id: id.into(),
        owner_id: owner_id.into(),
        filename: "cv.pdf".into(),
        file_link: format!("digest://{owner_id}/{digest}"),
        content_digest: digest.into(),
        analysis: CandidateAnalysis {
            name: "Ada Lovelace".into(),
            ..CandidateAnalysis::default()
        },
        vendor_id: None,
        vendor_name: None,
        created_at: at,
        updated_at: at,
    }
}

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";

/// Extractor double that replays a fixed response and counts calls.
pub struct StubExtractor {
    response: Result<String, IngestError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_media_type: Mutex<Option<MediaType>>,
}

impl StubExtractor {
    pub fn replying(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_media_type: Mutex::new(None),
        }
    }

    pub fn failing(err: IngestError) -> Self {
        Self {
            response: Err(err),
            ..Self::replying("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_media_type(&self) -> Option<MediaType> {
        *self.last_media_type.lock().unwrap()
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn extract(
        &self,
        _document: &[u8],
        media_type: MediaType,
        _instruction: &str,
    ) -> Result<String, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_media_type.lock().unwrap() = Some(media_type);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

/// Store double that fails the chosen operations with a backend error and
/// delegates everything else to an in-memory store.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemoryResumeStore,
    fail_lookup: bool,
    fail_save: bool,
    save_attempts: AtomicUsize,
}

impl FailingStore {
    pub fn on_lookup() -> Self {
        Self {
            fail_lookup: true,
            ..Self::default()
        }
    }

    pub fn on_save() -> Self {
        Self {
            fail_save: true,
            ..Self::default()
        }
    }

    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    fn unavailable() -> StoreError {
        StoreError::Backend("connection refused".into())
    }
}

#[async_trait]
impl ResumeStore for FailingStore {
    async fn find_by_owner_and_digest(
        &self,
        owner_id: &str,
        digest: &str,
    ) -> Result<Option<ResumeRecord>, StoreError> {
        if self.fail_lookup {
            return Err(Self::unavailable());
        }
        self.inner.find_by_owner_and_digest(owner_id, digest).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ResumeRecord>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, record: ResumeRecord) -> Result<ResumeRecord, StoreError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(Self::unavailable());
        }
        self.inner.save(record).await
    }

    async fn update_analysis(
        &self,
        id: &str,
        analysis: CandidateAnalysis,
        updated_at: DateTime<Utc>,
    ) -> Result<ResumeRecord, StoreError> {
        self.inner.update_analysis(id, analysis, updated_at).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_by_id(id).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn list_all(&self) -> Result<Vec<ResumeRecord>, StoreError> {
        self.inner.list_all().await
    }
}
