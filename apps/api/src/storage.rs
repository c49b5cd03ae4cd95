//! Artifact storage for generated documents.
//!
//! S3/MinIO in production; the trait exists so generator tests run
//! against an in-memory sink. Downloads go out as presigned URLs with a
//! one hour expiry, matching the job-result retention window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::collaborators::ExecutionError;
use crate::config::Config;

const DOWNLOAD_URL_EXPIRY: Duration = Duration::from_secs(3600);

#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Store the artifact and return a time-limited download URL.
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, ExecutionError>;
}

pub struct S3ArtifactStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArtifactStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ArtifactStorage for S3ArtifactStorage {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, ExecutionError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            // Storage hiccups are retryable from the job's point of view.
            .map_err(|e| ExecutionError::Transient(format!("S3 upload failed: {e}")))?;
        info!("Uploaded artifact to s3://{}/{}", self.bucket, key);

        let presigning = PresigningConfig::expires_in(DOWNLOAD_URL_EXPIRY)
            .map_err(|e| ExecutionError::Permanent(format!("invalid presigning config: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| ExecutionError::Transient(format!("S3 presign failed: {e}")))?;
        Ok(presigned.uri().to_string())
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-jobs-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

/// Test sink: remembers the last upload and hands back a fake URL.
pub struct MemoryArtifactStorage {
    pub uploads: std::sync::Mutex<Vec<(String, Bytes, String)>>,
}

impl MemoryArtifactStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            uploads: std::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ArtifactStorage for MemoryArtifactStorage {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, ExecutionError> {
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), body, content_type.to_string()));
        Ok(format!("memory://{key}"))
    }
}
