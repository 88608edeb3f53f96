use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::config::S3Settings;
use crate::ingest::{IngestError, MediaType};

/// Where uploaded documents live. Keys are content-addressed, so storing the
/// same document twice is idempotent.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Stores the document and returns the link recorded as `file_link`.
    async fn put(
        &self,
        owner_id: &str,
        digest: &str,
        media_type: MediaType,
        bytes: Bytes,
    ) -> Result<String, IngestError>;
}

pub fn document_key(owner_id: &str, digest: &str, media_type: MediaType) -> String {
    format!("resumes/{owner_id}/{digest}.{}", media_type.extension())
}

/// S3 / MinIO backed storage.
pub struct S3DocumentStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentStorage {
    pub async fn connect(settings: &S3Settings) -> Self {
        Self {
            client: build_s3_client(settings).await,
            bucket: settings.bucket.clone(),
        }
    }
}

#[async_trait]
impl DocumentStorage for S3DocumentStorage {
    async fn put(
        &self,
        owner_id: &str,
        digest: &str,
        media_type: MediaType,
        bytes: Bytes,
    ) -> Result<String, IngestError> {
        let key = document_key(owner_id, digest, media_type);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(media_type.as_str())
            .send()
            .await
            .map_err(|e| IngestError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded resume document to s3://{}/{}", self.bucket, key);
        Ok(format!("s3://{}/{}", self.bucket, key))
    }
}

/// Stores nothing; the link names the content digest. Used when no object
/// store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestLinkStorage;

#[async_trait]
impl DocumentStorage for DigestLinkStorage {
    async fn put(
        &self,
        owner_id: &str,
        digest: &str,
        _media_type: MediaType,
        _bytes: Bytes,
    ) -> Result<String, IngestError> {
        Ok(format!("digest://{owner_id}/{digest}"))
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(settings: &S3Settings) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &settings.access_key_id,
        &settings.secret_access_key,
        None,
        None,
        "ats-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&settings.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
