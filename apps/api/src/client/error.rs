use serde_json::Value;
use thiserror::Error;

use crate::client::coalesce::CallAborted;

/// A non-2xx response from the remote API.
///
/// `body` is the parsed JSON error payload, or `{"message": <raw text>}` when
/// the payload was not JSON.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("HTTP error! status: {status} {status_text}")]
pub struct HttpError {
    pub status: u16,
    pub status_text: String,
    pub body: Value,
}

impl HttpError {
    /// Best-effort human readable message from the error payload.
    pub fn message(&self) -> String {
        self.body
            .get("message")
            .or_else(|| self.body.get("error"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| self.status_text.clone())
    }
}

/// Errors surfaced by the API client. Cloneable so one coalesced failure can
/// be handed to every attached caller.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Could not decode response: {0}")]
    Decode(String),

    /// Refused locally before anything was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Aborted(#[from] CallAborted),
}

impl ClientError {
    /// The HTTP status when this error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http(e) => Some(e.status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}
