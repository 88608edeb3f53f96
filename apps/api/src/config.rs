use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub service_identity: Option<ServiceIdentity>,
    pub http_timeout: Option<Duration>,
    pub anthropic_api_key: String,
    pub extractor_timeout: Option<Duration>,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub s3: Option<S3Settings>,
    pub port: u16,
    pub rust_log: String,
}

/// Identity the token provider reports for identity bootstrap.
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Remote,
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("STORE_BACKEND must be one of remote, postgres, memory (got '{other}')"),
        }
    }
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5001/api";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend: StoreBackend = optional_env("STORE_BACKEND")
            .unwrap_or_else(|| "remote".to_string())
            .parse()?;
        let database_url = optional_env("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        Ok(Config {
            api_base_url: optional_env("API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_token: optional_env("API_TOKEN"),
            service_identity: optional_env("SERVICE_UID").map(|uid| ServiceIdentity {
                uid,
                email: optional_env("SERVICE_EMAIL"),
                display_name: optional_env("SERVICE_NAME"),
            }),
            http_timeout: optional_secs("HTTP_TIMEOUT_SECS")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            extractor_timeout: optional_secs("EXTRACTOR_TIMEOUT_SECS")?,
            store_backend,
            database_url,
            s3: s3_settings()?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// S3 settings are all-or-nothing: a bucket without credentials is a misconfiguration.
fn s3_settings() -> Result<Option<S3Settings>> {
    let Some(bucket) = optional_env("S3_BUCKET") else {
        return Ok(None);
    };
    Ok(Some(S3Settings {
        bucket,
        endpoint: require_env("S3_ENDPOINT")?,
        access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
        secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
    }))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_secs(key: &str) -> Result<Option<Duration>> {
    optional_env(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("{key} must be a whole number of seconds"))
        })
        .transpose()
}
