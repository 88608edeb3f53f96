use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version plus the number of coalesced calls currently in flight.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "in_flight": {
            "api_calls": state.api.in_flight(),
            "ingestions": state.pipeline.in_flight(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::ingest::{DigestLinkStorage, IngestionPipeline};
    use crate::routes::build_router;
    use crate::state::AppState;
    use crate::store::MemoryResumeStore;
    use crate::test_support::{client_for, StubExtractor};

    #[tokio::test]
    async fn test_health_reports_idle_counters() {
        let store = Arc::new(MemoryResumeStore::new());
        let pipeline = IngestionPipeline::new(
            store.clone(),
            Arc::new(StubExtractor::replying("{}")),
            Arc::new(DigestLinkStorage),
        );
        let app = build_router(AppState {
            api: client_for("http://127.0.0.1:9/api", None),
            resumes: store,
            pipeline,
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "ats-api");
        assert_eq!(body["in_flight"]["api_calls"], 0);
        assert_eq!(body["in_flight"]["ingestions"], 0);
    }
}
