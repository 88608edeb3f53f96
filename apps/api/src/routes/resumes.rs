use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::ingest::{IngestOutcome, UploadRequest};
use crate::models::ResumeRecord;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

/// POST /api/v1/resumes (multipart: `file`, `owner_id`, optional `vendor_id`, `vendor_name`)
///
/// 201 for a newly analysed resume, 200 when the same document was already on file.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestOutcome>), AppError> {
    let mut owner_id = None;
    let mut vendor_id = None;
    let mut vendor_name = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("resume").to_string();
                let content_type = field.content_type().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                file = Some((filename, content_type, bytes));
            }
            "owner_id" | "vendor_id" | "vendor_name" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read {name}: {e}")))?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match name.as_str() {
                    "owner_id" => owner_id = value,
                    "vendor_id" => vendor_id = value,
                    _ => vendor_name = value,
                }
            }
            _ => {}
        }
    }

    let owner_id = owner_id.ok_or_else(|| AppError::Validation("owner_id is required".into()))?;
    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("file is required".into()))?;

    let outcome = state
        .pipeline
        .ingest(UploadRequest {
            owner_id,
            filename,
            content_type,
            bytes,
            vendor_id,
            vendor_name,
        })
        .await?;

    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

/// GET /api/v1/resumes?owner_id=
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    Ok(Json(state.resumes.list_by_owner(&params.owner_id).await?))
}

/// GET /api/v1/resumes/all
pub async fn handle_list_all_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    Ok(Json(state.resumes.list_all().await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    state
        .resumes
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.resumes.delete_by_id(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
