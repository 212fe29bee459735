//! Object storage for uploaded videos and extracted screenshots
//! Uses Apache Arrow object_store crate

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::signer::Signer;
use object_store::{ObjectMeta, ObjectStore, path::Path as StoragePath};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{StorageConfig, StorageProvider};
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to initialise storage backend: {0}")]
    Backend(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::UploadFailed(_) => ErrorKind::Upload,
            StorageError::NotFound(_) => ErrorKind::Fetch,
            StorageError::Backend(_) => ErrorKind::Internal,
            StorageError::ObjectStoreError(_) => ErrorKind::Upload,
        }
    }
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Location of an object after upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    pub url: String,
}

/// Client for a single bucket
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
    public_base_url: String,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .field("signing", &self.signer.is_some())
            .finish()
    }
}

impl StorageClient {
    /// Create a client with any object_store backend
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            signer: None,
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Attach a signer for presigned URLs
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory(bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), bucket, public_base_url)
    }

    /// Build the client for `bucket` from the configured provider
    pub fn from_config(config: &StorageConfig, bucket: &str) -> Result<Self> {
        match config.provider {
            StorageProvider::Memory => Ok(Self::in_memory(bucket, &config.public_base_url)),
            StorageProvider::Local => {
                let root = config.local_root.join(bucket);
                std::fs::create_dir_all(&root).map_err(|e| {
                    StorageError::Backend(format!("{}: {}", root.display(), e))
                })?;
                let store = LocalFileSystem::new_with_prefix(&root)?;
                info!(bucket, root = %root.display(), "Using local object storage");
                Ok(Self::new(Arc::new(store), bucket, &config.public_base_url))
            }
            StorageProvider::S3 => {
                let mut builder = AmazonS3Builder::new().with_bucket_name(bucket);
                if let Some(region) = &config.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let Some(access_key) = &config.access_key {
                    builder = builder.with_access_key_id(access_key);
                }
                if let Some(secret_key) = &config.secret_key {
                    builder = builder.with_secret_access_key(secret_key);
                }
                let s3 = Arc::new(builder.build()?);
                info!(bucket, "Using S3 object storage");
                Ok(Self::new(s3.clone(), bucket, &config.public_base_url).with_signer(s3))
            }
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store an uploaded video under `<unique prefix>_<sanitized name>`
    pub async fn upload_video(&self, data: Bytes, file_name: &str) -> Result<UploadedObject> {
        let key = format!("{}_{}", unique_prefix(), sanitize_file_name(file_name));
        self.upload(&key, data).await?;
        let url = self.public_url(&key);
        Ok(UploadedObject { key, url })
    }

    /// Upload bytes to storage
    pub async fn upload(&self, key: &str, data: Bytes) -> Result<()> {
        let path = StoragePath::from(key);
        let size = data.len();

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        info!(bucket = %self.bucket, key, size, "Uploaded to storage");
        Ok(())
    }

    /// Download from storage
    pub async fn download(&self, key: &str) -> Result<Bytes> {
        let path = StoragePath::from(key);

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let bytes = result.bytes().await?;

        debug!(bucket = %self.bucket, key, size = bytes.len(), "Downloaded from storage");
        Ok(bytes)
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = StoragePath::from(key);

        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }

    /// Time-limited read URL; backends without credentials hand out the public URL
    pub async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String> {
        match &self.signer {
            Some(signer) => {
                let path = StoragePath::from(key);
                let url = signer.signed_url(reqwest::Method::GET, &path, ttl).await?;
                Ok(url.to_string())
            }
            None => Ok(self.public_url(key)),
        }
    }

    /// Best-effort removal; failures are logged and swallowed.
    /// Returns `false` when the backend refused the delete.
    pub async fn delete(&self, key: &str) -> bool {
        let path = StoragePath::from(key);
        match self.store.delete(&path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(bucket = %self.bucket, key, error = %e, "Failed to delete object");
                false
            }
        }
    }

    /// Keys last modified before `cutoff`, plus the total number of objects listed
    pub async fn list_older_than(&self, cutoff: DateTime<Utc>) -> Result<(Vec<String>, usize)> {
        let objects: Vec<ObjectMeta> = self.store.list(None).try_collect().await?;
        let total = objects.len();

        let expired = objects
            .into_iter()
            .filter(|meta| meta.last_modified < cutoff)
            .map(|meta| meta.location.to_string())
            .collect();

        Ok((expired, total))
    }

    /// Delete every key, returning the ones actually removed
    pub async fn delete_many(&self, keys: &[String]) -> Vec<String> {
        let mut deleted = Vec::with_capacity(keys.len());
        for key in keys {
            if self.delete(key).await {
                deleted.push(key.clone());
            }
        }
        deleted
    }
}

/// `<unix_millis>_<uuid v7>`; keys built on it never collide across writers
pub fn unique_prefix() -> String {
    format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::now_v7().simple()
    )
}

/// Keep object keys URL- and filesystem-safe
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}
