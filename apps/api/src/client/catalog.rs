//! Vendor and job endpoints. Payloads pass through as JSON; their schema
//! belongs to the admin API.

use serde_json::{json, Value};

use crate::client::{segment, ApiClient, ApiRequest, ClientError};

impl ApiClient {
    pub async fn list_vendors(&self) -> Result<Vec<Value>, ClientError> {
        self.send_json(ApiRequest::get("/vendors")).await
    }

    pub async fn get_vendor(&self, id: &str) -> Result<Value, ClientError> {
        self.send(ApiRequest::get(format!("/vendors/{}", segment(id)?))).await
    }

    pub async fn create_vendor(&self, data: Value) -> Result<Value, ClientError> {
        self.send(ApiRequest::post("/vendors", data)).await
    }

    pub async fn update_vendor(&self, id: &str, data: Value) -> Result<Value, ClientError> {
        self.send(ApiRequest::put(format!("/vendors/{}", segment(id)?), data)).await
    }

    pub async fn delete_vendor(&self, id: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(format!("/vendors/{}", segment(id)?))).await?;
        Ok(())
    }

    pub async fn list_jobs(&self) -> Result<Vec<Value>, ClientError> {
        self.send_json(ApiRequest::get("/jobs")).await
    }

    pub async fn get_job(&self, id: &str) -> Result<Value, ClientError> {
        self.send(ApiRequest::get(format!("/jobs/{}", segment(id)?))).await
    }

    pub async fn create_job(&self, data: Value) -> Result<Value, ClientError> {
        self.send(ApiRequest::post("/jobs", data)).await
    }

    pub async fn update_job(&self, id: &str, data: Value) -> Result<Value, ClientError> {
        self.send(ApiRequest::put(format!("/jobs/{}", segment(id)?), data)).await
    }

    pub async fn delete_job(&self, id: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(format!("/jobs/{}", segment(id)?))).await?;
        Ok(())
    }

    pub async fn job_candidates(&self, job_id: &str) -> Result<Value, ClientError> {
        self.send(ApiRequest::get(format!("/jobs/{}/candidates", segment(job_id)?)))
            .await
    }

    pub async fn save_job_candidates(
        &self,
        job_id: &str,
        candidates: Vec<Value>,
    ) -> Result<Value, ClientError> {
        self.send(ApiRequest::put(
            format!("/jobs/{}/candidates", segment(job_id)?),
            json!({ "candidates": candidates }),
        ))
        .await
    }

    /// `extra` fields (notes, interview dates) are merged beside `status`.
    pub async fn update_candidate_status(
        &self,
        job_id: &str,
        candidate_id: &str,
        status: &str,
        extra: Value,
    ) -> Result<Value, ClientError> {
        let mut body = match extra {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        body.insert("status".into(), Value::String(status.to_string()));
        self.send(ApiRequest::put(
            format!(
                "/jobs/{}/candidates/{}/status",
                segment(job_id)?,
                segment(candidate_id)?
            ),
            Value::Object(body),
        ))
        .await
    }

    pub async fn assign_recruiters(
        &self,
        job_id: &str,
        recruiter_ids: &[String],
    ) -> Result<Value, ClientError> {
        self.send(ApiRequest::post(
            format!("/jobs/{}/recruiters", segment(job_id)?),
            json!({ "recruiterIds": recruiter_ids }),
        ))
        .await
    }

    pub async fn check_new_resumes(&self, job_id: &str) -> Result<Value, ClientError> {
        self.send(ApiRequest::get(format!("/jobs/{}/check-new-resumes", segment(job_id)?)))
            .await
    }
}
