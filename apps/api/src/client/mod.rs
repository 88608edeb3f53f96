//! Authenticated client for the remote admin API.
//!
//! Every JSON call goes through [`ApiClient::send`], which builds the absolute
//! URL, injects the bearer token and routes the call through a
//! [`RequestCoalescer`] keyed by (method, URL, body). Endpoint families live in
//! the submodules as thin wrappers over `send`.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

pub mod auth;
pub mod catalog;
pub mod coalesce;
pub mod error;
pub mod identity;
pub mod resumes;

pub use auth::{ProviderIdentity, StaticTokenProvider, TokenProvider};
pub use coalesce::{CallAborted, RequestCoalescer};
pub use error::{ClientError, HttpError};

/// Identity of an outbound call for coalescing purposes.
///
/// Built from the method, the absolute URL and the serialized body (an absent
/// body serializes as `{}`). Object keys serialize in sorted order, so two
/// logically identical bodies yield equal keys. Extra headers and `skip_auth`
/// are not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    url: String,
    body: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &str, body: Option<&Value>) -> Self {
        let empty = json!({});
        Self {
            method: method.clone(),
            url: url.to_string(),
            body: body.unwrap_or(&empty).to_string(),
        }
    }
}

/// A single JSON call against the admin API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: HeaderMap,
    pub skip_auth: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            skip_auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Percent-encodes one caller-supplied path segment (an id).
///
/// Empty, `.` and `..` are refused: URL normalization would otherwise turn
/// them into a different resource path.
pub fn segment(value: &str) -> Result<String, ClientError> {
    match value.trim() {
        "" | "." | ".." => Err(ClientError::InvalidRequest(format!(
            "'{value}' is not a valid id"
        ))),
        _ => Ok(urlencoding::encode(value).into_owned()),
    }
}

/// Joins `base` and `path` with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    in_flight: RequestCoalescer<RequestKey, Value, ClientError>,
}

impl ApiClient {
    /// `timeout` of `None` leaves calls without a deadline; callers that need
    /// one impose it themselves.
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into(),
            tokens,
            in_flight: RequestCoalescer::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Number of coalesced calls currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.in_flight()
    }

    /// Sends a JSON request, sharing the result with any identical call
    /// already in flight.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let url = self.url(&request.path);
        let key = RequestKey::new(&request.method, &url, request.body.as_ref());
        if request.method == Method::GET {
            debug!("API request: {} {}", request.method, url);
        }

        let client = self.clone();
        self.in_flight
            .execute(key, move || async move { client.dispatch(url, request).await })
            .await
    }

    /// [`send`](Self::send) and decode the response into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let value = self.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetches raw bytes from an authenticated endpoint. Not coalesced.
    ///
    /// Fails locally with [`ClientError::AuthRequired`] when no token is
    /// available, since these endpoints never serve anonymous callers.
    pub async fn fetch_bytes(&self, path: &str, purpose: &str) -> Result<Bytes, ClientError> {
        let token = self
            .tokens
            .token(false)
            .await
            .ok_or_else(|| ClientError::AuthRequired(format!("Authentication required to {purpose}")))?;

        let url = self.url(path);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await.into());
        }
        Ok(response.bytes().await?)
    }

    async fn dispatch(&self, url: String, request: ApiRequest) -> Result<Value, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(request.headers);

        let mut builder = self.http.request(request.method.clone(), &url).headers(headers);
        if !request.skip_auth {
            match self.tokens.token(false).await {
                Some(token) => builder = builder.bearer_auth(token),
                None => debug!("No token available; sending {} {} unauthenticated", request.method, url),
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await.map_err(|e| {
            error!("API request failed: {} {}: {e}", request.method, request.path);
            ClientError::from(e)
        })?;

        if !response.status().is_success() {
            let err = http_error(response).await;
            error!("API error ({}): {}", err.status, err.body);
            return Err(err.into());
        }

        let raw = response.bytes().await?;
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Reads an error response body, keeping it structured when it parses as JSON.
async fn http_error(response: Response) -> HttpError {
    let status = response.status();
    let raw = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&raw).unwrap_or_else(|_| {
        debug!("Failed to parse error response as JSON: {raw}");
        json!({ "message": raw })
    });
    HttpError {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        body,
    }
}

/// Treats a forbidden or missing listing as an empty one.
pub(crate) fn empty_on_denied<T>(result: Result<Vec<T>, ClientError>, what: &str) -> Result<Vec<T>, ClientError> {
    match result {
        Err(err) if matches!(err.status(), Some(403 | 404)) => {
            warn!("Access to {what} denied ({err}); returning an empty list");
            Ok(Vec::new())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use futures_util::future::join_all;

    use crate::test_support::{client_for, spawn_stub};

    #[test]
    fn test_join_url_leading_slash_is_optional() {
        let base = "http://localhost:5001/api";
        assert_eq!(join_url(base, "auth/users"), join_url(base, "/auth/users"));
        assert_eq!(join_url(base, "/auth/users"), "http://localhost:5001/api/auth/users");
    }

    #[test]
    fn test_join_url_collapses_duplicate_separators() {
        assert_eq!(
            join_url("http://h/api/", "//resumes"),
            "http://h/api/resumes"
        );
    }

    #[test]
    fn test_segment_encodes_separators_and_refuses_dot_segments() {
        assert_eq!(segment("r1").unwrap(), "r1");
        assert_eq!(segment("../vendors/v1").unwrap(), "..%2Fvendors%2Fv1");
        assert_eq!(segment("a?b#c").unwrap(), "a%3Fb%23c");
        for bad in ["", " ", ".", ".."] {
            assert!(matches!(segment(bad), Err(ClientError::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_request_key_ignores_body_key_order() {
        let a: Value = serde_json::from_str(r#"{"fileHash":"x","userId":"u"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"userId":"u","fileHash":"x"}"#).unwrap();
        assert_eq!(
            RequestKey::new(&Method::POST, "http://h/a", Some(&a)),
            RequestKey::new(&Method::POST, "http://h/a", Some(&b))
        );
    }

    #[test]
    fn test_request_key_absent_body_equals_empty_object() {
        assert_eq!(
            RequestKey::new(&Method::GET, "http://h/a", None),
            RequestKey::new(&Method::GET, "http://h/a", Some(&json!({})))
        );
        assert_ne!(
            RequestKey::new(&Method::GET, "http://h/a", None),
            RequestKey::new(&Method::DELETE, "http://h/a", None)
        );
    }

    #[tokio::test]
    async fn test_identical_concurrent_calls_hit_server_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/api/jobs",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Json(json!([{"id": "j1"}]))
                }
            }),
        );
        let client = client_for(&spawn_stub(router).await, Some("tok"));

        let results = join_all((0..5).map(|_| client.send(ApiRequest::get("/jobs")))).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), json!([{"id": "j1"}]));
        }
        assert_eq!(client.in_flight(), 0);

        client.send(ApiRequest::get("jobs")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bearer_token_and_content_type_are_sent() {
        let router = Router::new().route(
            "/api/echo",
            post(|headers: AxumHeaders, Json(body): Json<Value>| async move {
                let header = |name: &str| {
                    headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(String::from)
                };
                Json(json!({
                    "authorization": header("authorization"),
                    "content_type": header("content-type"),
                    "body": body,
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let authed = client_for(&base, Some("secret"));
        let echoed = authed
            .send(ApiRequest::post("echo", json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(echoed["authorization"], "Bearer secret");
        assert_eq!(echoed["content_type"], "application/json");
        assert_eq!(echoed["body"], json!({"a": 1}));

        let skipped = authed
            .send(ApiRequest::post("echo", json!({"a": 2})).skip_auth())
            .await
            .unwrap();
        assert_eq!(skipped["authorization"], Value::Null);

        let anonymous = client_for(&base, None);
        let echoed = anonymous
            .send(ApiRequest::post("echo", json!({"a": 3})))
            .await
            .unwrap();
        assert_eq!(echoed["authorization"], Value::Null);
    }

    #[tokio::test]
    async fn test_error_body_is_parsed_or_wrapped() {
        let router = Router::new()
            .route(
                "/api/json-error",
                get(|| async { (StatusCode::CONFLICT, Json(json!({"message": "taken"}))) }),
            )
            .route(
                "/api/text-error",
                get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
            );
        let client = client_for(&spawn_stub(router).await, None);

        let err = client.send(ApiRequest::get("json-error")).await.unwrap_err();
        match err {
            ClientError::Http(e) => {
                assert_eq!(e.status, 409);
                assert_eq!(e.status_text, "Conflict");
                assert_eq!(e.body, json!({"message": "taken"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = client.send(ApiRequest::get("text-error")).await.unwrap_err();
        match err {
            ClientError::Http(e) => {
                assert_eq!(e.status, 502);
                assert_eq!(e.body, json!({"message": "upstream down"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let router = Router::new().route(
            "/api/resumes/r1",
            axum::routing::delete(|| async { StatusCode::NO_CONTENT }),
        );
        let client = client_for(&spawn_stub(router).await, Some("tok"));
        let value = client.send(ApiRequest::delete("/resumes/r1")).await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = client_for("http://127.0.0.1:9/api", None);
        let err = client.send(ApiRequest::get("/jobs")).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fetch_bytes_requires_token() {
        let client = client_for("http://127.0.0.1:9/api", None);
        let err = client
            .fetch_bytes("/resumes/r1/content", "view resume")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthRequired(_)));
    }
}
