//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ObjectStoreError, Result};

/// Configuration for the custody storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },

    /// HTTP custody endpoint
    Http {
        /// Endpoint accepting `POST` uploads and `GET ?id=` downloads
        url: Url,
    },
}

/// Wrapper around the `object_store` backends.
#[derive(Debug, Clone)]
pub(crate) struct Storage {
    inner: Arc<dyn ObjectStore>,
}

impl Storage {
    /// Create a new storage backend from configuration.
    pub async fn new(config: &ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::Local { path } => {
                // Ensure directory exists
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| ObjectStoreError::InvalidConfig(e.to_string()))?,
                )
            }

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| ObjectStoreError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast if the bucket doesn't exist
                {
                    use futures::TryStreamExt;
                    let prefix = ObjectPath::from("");
                    let mut stream = store.list(Some(&prefix));
                    match stream.try_next().await {
                        Ok(_) => {}
                        Err(object_store::Error::NotFound { .. }) => {
                            return Err(ObjectStoreError::BucketNotFound(bucket.clone()));
                        }
                        Err(e) => {
                            let msg = e.to_string();
                            if msg.contains("NoSuchBucket")
                                || msg.contains("bucket") && msg.contains("not")
                            {
                                return Err(ObjectStoreError::BucketNotFound(bucket.clone()));
                            }
                            return Err(e.into());
                        }
                    }
                }

                store
            }

            ObjectStoreConfig::Http { .. } => {
                return Err(ObjectStoreError::InvalidConfig(
                    "http endpoints are not object storage".to_string(),
                ))
            }
        };

        Ok(Self { inner })
    }

    /// Build the object path for a shard blob.
    fn blob_path(hash: &str) -> ObjectPath {
        ObjectPath::from(format!("shards/{}", hash))
    }

    /// Put a blob into storage.
    pub async fn put_blob(&self, hash: &str, data: Bytes) -> Result<()> {
        let path = Self::blob_path(hash);
        self.inner.put(&path, data.into()).await?;
        Ok(())
    }

    /// Get a blob from storage.
    pub async fn get_blob(&self, hash: &str) -> Result<Option<Bytes>> {
        let path = Self::blob_path(hash);
        match self.inner.get(&path).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                Ok(Some(bytes))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob from storage.
    pub async fn delete_blob(&self, hash: &str) -> Result<bool> {
        let path = Self::blob_path(hash);
        match self.inner.delete(&path).await {
            Ok(()) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
impl Storage {
    /// Create an in-memory storage backend (test-only).
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    /// Check if a blob exists in storage.
    pub async fn has_blob(&self, hash: &str) -> Result<bool> {
        let path = Self::blob_path(hash);
        match self.inner.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List all blob hashes in storage.
    pub async fn list_blob_hashes(&self) -> Result<Vec<String>> {
        use futures::TryStreamExt;

        let prefix = ObjectPath::from("shards/");
        let stream = self.inner.list(Some(&prefix));

        let items: Vec<_> = stream.try_collect().await?;

        let hashes = items
            .into_iter()
            .filter_map(|meta| {
                let path = meta.location.as_ref();
                path.strip_prefix("shards/").map(|s| s.to_string())
            })
            .collect();

        Ok(hashes)
    }
}
