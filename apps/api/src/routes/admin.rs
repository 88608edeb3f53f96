use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

/// Headline counts for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub users: usize,
    pub resumes: usize,
    pub vendors: usize,
    pub jobs: usize,
}

/// GET /api/v1/identity
/// The caller's identity record, created from provider data on first use.
pub async fn handle_current_identity(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.api.current_identity().await?))
}

/// GET /api/v1/users
pub async fn handle_list_users(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.api.list_users().await?))
}

/// GET /api/v1/admin/stats
///
/// The user directory must load; the other three sources are fetched
/// concurrently and count as zero when they fail.
pub async fn handle_admin_stats(State(state): State<AppState>) -> Result<Json<AdminStats>, AppError> {
    let users = state.api.list_users().await?;

    let (resumes, vendors, jobs) = tokio::join!(
        state.resumes.list_all(),
        state.api.list_vendors(),
        state.api.list_jobs(),
    );

    Ok(Json(AdminStats {
        users: users.len(),
        resumes: count_or_zero(resumes, "resumes"),
        vendors: count_or_zero(vendors, "vendors"),
        jobs: count_or_zero(jobs, "jobs"),
    }))
}

fn count_or_zero<T, E: std::fmt::Display>(result: Result<Vec<T>, E>, what: &str) -> usize {
    match result {
        Ok(items) => items.len(),
        Err(e) => {
            warn!("Could not count {what}: {e}");
            0
        }
    }
}
