//! `/auth/*` endpoints: the caller's own identity and the user directory.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::client::auth::ProviderIdentity;
use crate::client::{empty_on_denied, ApiClient, ApiRequest, ClientError};

/// Payload for creating an identity record from provider data.
#[derive(Debug, Clone, Serialize)]
pub struct NewIdentity {
    pub uid: String,
    pub email: String,
    pub name: String,
}

impl From<&ProviderIdentity> for NewIdentity {
    fn from(identity: &ProviderIdentity) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone().unwrap_or_default(),
            name: identity.fallback_name(),
        }
    }
}

impl ApiClient {
    /// Returns the caller's identity record, creating it from provider data
    /// when the API has never seen this principal (404).
    ///
    /// If there is no provider identity to create from, the original 404 is
    /// returned; if creation fails, its error is returned.
    pub async fn current_identity(&self) -> Result<Value, ClientError> {
        match self.send(ApiRequest::get("/auth/me")).await {
            Err(err) if err.status() == Some(404) => {
                let Some(identity) = self.tokens.identity().await else {
                    error!("No provider identity available to create an account");
                    return Err(err);
                };
                info!("User not found, creating from provider identity {}", identity.uid);
                let created = self.create_from_auth(&NewIdentity::from(&identity)).await?;
                info!("Created user {} from provider identity", identity.uid);
                Ok(created)
            }
            other => other,
        }
    }

    pub async fn update_identity(&self, data: Value) -> Result<Value, ClientError> {
        self.send(ApiRequest::put("/auth/me", data)).await
    }

    /// Admin-only. Non-admins get an empty directory instead of an error.
    pub async fn list_users(&self) -> Result<Vec<Value>, ClientError> {
        empty_on_denied(self.send_json(ApiRequest::get("/auth/users")).await, "all users")
    }

    pub async fn update_user_role(&self, user_id: &str, role: &str) -> Result<Value, ClientError> {
        self.send(ApiRequest::put(
            "/auth/users/role",
            json!({ "userId": user_id, "role": role }),
        ))
        .await
    }

    pub async fn create_from_auth(&self, identity: &NewIdentity) -> Result<Value, ClientError> {
        let body = serde_json::to_value(identity)?;
        self.send(ApiRequest::post("/auth/create-from-auth", body).skip_auth())
            .await
            .map_err(|e| {
                warn!("Error creating user from auth: {e}");
                e
            })
    }

    pub async fn make_admin(&self, email: &str) -> Result<Value, ClientError> {
        self.send(ApiRequest::post("/auth/make-admin", json!({ "email": email })).skip_auth())
            .await
    }
}
