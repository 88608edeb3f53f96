pub mod admin;
pub mod health;
pub mod resumes;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::state::AppState;

/// Upload ceiling for a single resume document.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resumes
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_upload),
        )
        .route("/api/v1/resumes/all", get(resumes::handle_list_all_resumes))
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get_resume).delete(resumes::handle_delete_resume),
        )
        // Identity and admin views
        .route("/api/v1/identity", get(admin::handle_current_identity))
        .route("/api/v1/users", get(admin::handle_list_users))
        .route("/api/v1/admin/stats", get(admin::handle_admin_stats))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
