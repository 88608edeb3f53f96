use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Supplies bearer credentials for outbound API calls.
///
/// Implementations swallow their own failures and return `None`; the client
/// then sends the request unauthenticated and lets the server decide.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, force_refresh: bool) -> Option<String>;

    /// The signed-in principal as the identity provider knows it.
    async fn identity(&self) -> Option<ProviderIdentity>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ProviderIdentity {
    /// Display name, else the local part of the email, else `"User"`.
    pub fn fallback_name(&self) -> String {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or("User")
            .to_string()
    }
}

/// A provider holding one long-lived credential, configured at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
    identity: Option<ProviderIdentity>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>, identity: Option<ProviderIdentity>) -> Self {
        Self { token, identity }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _force_refresh: bool) -> Option<String> {
        self.token.clone()
    }

    async fn identity(&self) -> Option<ProviderIdentity> {
        self.identity.clone()
    }
}
