use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};

/// StorageError
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object upload failed: {0}")]
    Upload(String),
    #[error("object removal failed: {0}")]
    Remove(String),
}

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for all interactions with the object storage layer.
/// This trait allows us to swap the concrete implementation, from the real S3 client
/// (S3StorageClient) in production to the in-memory Mock (MockStorageService) during
/// testing, without affecting the calling handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup
    /// to provision the required bucket in MinIO.
    async fn ensure_bucket_exists(&self);

    /// Uploads a fully buffered object and returns the durable URL clients can fetch it from.
    ///
    /// # Arguments
    /// * `key`: The object key (path + filename) in the bucket.
    /// * `content_type`: The MIME type stored with the object (e.g., "image/png").
    /// * `bytes`: The complete object body.
    async fn upload(&self, key: &str, content_type: &str, bytes: Vec<u8>)
    -> Result<String, StorageError>;

    /// Deletes an object previously written with `upload`. Used to clean up after a
    /// write that failed once its image was already stored.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3. Any S3-compatible endpoint works;
/// locally this is the Dockerized MinIO instance.
///
/// The `force_path_style(true)` is required for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_url: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    /// `public_url` is the externally reachable base under which `{bucket}/{key}` is served.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket_name, key)
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// Calls the S3 CreateBucket API. An "already owned" error is the normal case after the
    /// first start and is only logged at debug level.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        tracing::info!(%key, "image uploaded");
        Ok(self.object_url(&key))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key);

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::Remove(e.to_string()))?;

        tracing::info!(%key, "image removed");
        Ok(())
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) and empty segments from an object
/// key so a crafted filename cannot escape its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// A `StorageService` that keeps nothing but a record of the keys it was asked to store.
/// Lets handler tests cover the image path without a network connection to S3.
#[derive(Default)]
pub struct MockStorageService {
    /// When true, every upload returns a simulated failure.
    pub should_fail: bool,
    uploaded: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Keys currently stored, in upload order. Removed keys are dropped.
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploaded
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn upload(
        &self,
        key: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Upload(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        let sanitized_key = sanitize_key(key);
        if let Ok(mut keys) = self.uploaded.lock() {
            keys.push(sanitized_key.clone());
        }

        // Deterministic, local-style URL for assertions.
        Ok(format!("http://localhost:9000/mock-bucket/{sanitized_key}"))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let sanitized_key = sanitize_key(key);
        if let Ok(mut keys) = self.uploaded.lock() {
            keys.retain(|k| *k != sanitized_key);
        }
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service access across the application state.
pub type StorageState = Arc<dyn StorageService>;
