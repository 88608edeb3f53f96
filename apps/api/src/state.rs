use std::sync::Arc;

use crate::client::ApiClient;
use crate::ingest::IngestionPipeline;
use crate::store::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Coalescing client for the admin API.
    pub api: ApiClient,
    pub resumes: Arc<dyn ResumeStore>,
    pub pipeline: IngestionPipeline,
}
