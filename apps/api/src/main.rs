use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ats_api::client::{ApiClient, ProviderIdentity, StaticTokenProvider};
use ats_api::config::{Config, StoreBackend};
use ats_api::ingest::{DigestLinkStorage, DocumentStorage, IngestionPipeline, S3DocumentStorage};
use ats_api::llm_client::{self, LlmClient};
use ats_api::routes::build_router;
use ats_api::state::AppState;
use ats_api::store::{MemoryResumeStore, PgResumeStore, RemoteResumeStore, ResumeStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Admin API client
    let identity = config.service_identity.as_ref().map(|s| ProviderIdentity {
        uid: s.uid.clone(),
        email: s.email.clone(),
        display_name: s.display_name.clone(),
    });
    let tokens = StaticTokenProvider::new(config.api_token.clone(), identity);
    let api = ApiClient::new(&config.api_base_url, Arc::new(tokens), config.http_timeout)?;
    info!("Admin API client initialized ({})", api.base_url());

    // Resume store
    let resumes: Arc<dyn ResumeStore> = match config.store_backend {
        StoreBackend::Remote => Arc::new(RemoteResumeStore::new(api.clone())),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required when STORE_BACKEND=postgres")?;
            Arc::new(PgResumeStore::connect(url).await?)
        }
        StoreBackend::Memory => Arc::new(MemoryResumeStore::new()),
    };
    info!("Resume store: {:?}", config.store_backend);

    // Document storage
    let storage: Arc<dyn DocumentStorage> = match &config.s3 {
        Some(settings) => {
            info!("S3 client initialized (bucket: {})", settings.bucket);
            Arc::new(S3DocumentStorage::connect(settings).await)
        }
        None => {
            info!("S3 not configured; documents are linked by digest only");
            Arc::new(DigestLinkStorage)
        }
    };

    // Extractor
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.extractor_timeout)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let pipeline = IngestionPipeline::new(Arc::clone(&resumes), Arc::new(llm), storage);

    let state = AppState {
        api,
        resumes,
        pipeline,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
