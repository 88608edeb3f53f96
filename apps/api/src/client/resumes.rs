//! `/resumes/*` endpoints.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{empty_on_denied, segment, ApiClient, ApiRequest, ClientError};
use crate::models::{CandidateAnalysis, ResumeRecord};

#[derive(Debug, Deserialize)]
struct DuplicateCheck {
    #[serde(default, alias = "isDuplicate")]
    is_duplicate: bool,
    #[serde(default, alias = "existingResume")]
    resume: Option<ResumeRecord>,
}

impl ApiClient {
    /// Looks up an existing resume for `owner_id` with the same content digest.
    pub async fn check_duplicate(
        &self,
        digest: &str,
        owner_id: &str,
    ) -> Result<Option<ResumeRecord>, ClientError> {
        let request = ApiRequest::post(
            "/resumes/check-duplicate",
            json!({ "fileHash": digest, "userId": owner_id }),
        );
        match self.send_json::<DuplicateCheck>(request).await {
            Ok(check) if check.is_duplicate => Ok(check.resume),
            Ok(_) => Ok(None),
            Err(err) if err.status() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn save_resume(&self, record: &ResumeRecord) -> Result<ResumeRecord, ClientError> {
        let body = serde_json::to_value(record)?;
        self.send_json(ApiRequest::post("/resumes", body)).await
    }

    pub async fn update_resume_analysis(
        &self,
        id: &str,
        analysis: &CandidateAnalysis,
    ) -> Result<ResumeRecord, ClientError> {
        let body = json!({ "analysis": analysis });
        self.send_json(ApiRequest::put(format!("/resumes/{}", segment(id)?), body))
            .await
    }

    pub async fn list_resumes(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, ClientError> {
        self.send_json(ApiRequest::get(format!(
            "/resumes?userId={}",
            urlencoding::encode(owner_id)
        )))
            .await
    }

    /// Admin-only. Non-admins get an empty list instead of an error.
    pub async fn list_all_resumes(&self) -> Result<Vec<ResumeRecord>, ClientError> {
        empty_on_denied(
            self.send_json(ApiRequest::get("/resumes/admin/all")).await,
            "all resumes",
        )
    }

    pub async fn get_resume(&self, id: &str) -> Result<ResumeRecord, ClientError> {
        self.send_json(ApiRequest::get(format!("/resumes/{}", segment(id)?))).await
    }

    pub async fn delete_resume(&self, id: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(format!("/resumes/{}", segment(id)?))).await?;
        Ok(())
    }

    /// Every resume visible to the job matcher.
    pub async fn list_resumes_for_matching(&self) -> Result<Vec<Value>, ClientError> {
        self.send_json(ApiRequest::get("/jobs/resumes/all")).await
    }

    pub async fn resume_content(&self, id: &str) -> Result<Bytes, ClientError> {
        self.fetch_bytes(&format!("/resumes/{}/content", segment(id)?), "view resume")
            .await
    }

    pub async fn download_resume(&self, id: &str) -> Result<Bytes, ClientError> {
        self.fetch_bytes(&format!("/resumes/{}/download", segment(id)?), "download resume")
            .await
    }
}
