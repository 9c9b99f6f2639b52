//! ObjectStore - the custody store front over every backend.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{ObjectStoreError, Result};
use crate::http::HttpEndpoint;
use crate::storage::{ObjectStoreConfig, Storage};

/// Where a stored blob lives, as handed back by [`ObjectStore::put`].
///
/// For object storage backends this is the hex BLAKE3 hash of the stored
/// bytes; for the HTTP endpoint it is whatever object id the endpoint issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locator {
    type Err = ObjectStoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.contains(':') {
            return Err(ObjectStoreError::InvalidLocator(s.to_string()));
        }
        Ok(Locator(s.to_string()))
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Storage(Storage),
    Http(HttpEndpoint),
}

/// Stores opaque shard blobs and fetches them back by [`Locator`].
///
/// The store performs no retries: failures are returned to the caller as-is.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    backend: Backend,
}

impl ObjectStore {
    /// Create a new ObjectStore with the given configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let backend = match config {
            ObjectStoreConfig::Http { url } => Backend::Http(HttpEndpoint::new(url)),
            config => Backend::Storage(Storage::new(&config).await?),
        };
        Ok(Self { backend })
    }

    /// Create a new ObjectStore backed by the local filesystem.
    pub async fn new_local(data_dir: &Path) -> Result<Self> {
        Self::new(ObjectStoreConfig::Local {
            path: data_dir.to_path_buf(),
        })
        .await
    }

    /// Create a fully ephemeral in-memory ObjectStore.
    pub async fn new_ephemeral() -> Result<Self> {
        Self::new(ObjectStoreConfig::Memory).await
    }

    /// Create a new ObjectStore with S3/MinIO storage.
    ///
    /// # Arguments
    /// * `endpoint` - S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
    /// * `access_key` - S3 access key ID
    /// * `secret_key` - S3 secret access key
    /// * `bucket` - S3 bucket name
    /// * `region` - Optional S3 region (defaults to "us-east-1")
    pub async fn new_s3(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        region: Option<&str>,
    ) -> Result<Self> {
        Self::new(ObjectStoreConfig::S3 {
            endpoint: endpoint.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            bucket: bucket.to_string(),
            region: region.map(|s| s.to_string()),
        })
        .await
    }

    /// Create a new ObjectStore talking to an HTTP custody endpoint.
    pub fn new_http(url: Url) -> Self {
        Self {
            backend: Backend::Http(HttpEndpoint::new(url)),
        }
    }

    /// Store a blob on behalf of `shard_id` and return its locator.
    pub async fn put(&self, shard_id: &str, blob: Bytes) -> Result<Locator> {
        let size = blob.len();
        let locator = match &self.backend {
            Backend::Storage(storage) => {
                let hash = blake3::hash(&blob).to_hex().to_string();
                storage.put_blob(&hash, blob).await?;
                hash
            }
            Backend::Http(endpoint) => endpoint.upload(shard_id, &blob).await?,
        };

        info!(shard_id = %shard_id, locator = %locator, size = size, "shard blob stored");
        Ok(Locator(locator))
    }

    /// Retrieve a blob by locator, `None` if the backend does not hold it.
    pub async fn get(&self, locator: &Locator) -> Result<Option<Bytes>> {
        debug!(locator = %locator, "fetching shard blob");
        match &self.backend {
            Backend::Storage(storage) => {
                let hash = Self::check_hash_locator(locator)?;
                let Some(blob) = storage.get_blob(hash).await? else {
                    return Ok(None);
                };
                // content addressed: refuse bytes that don't hash to the locator
                if blake3::hash(&blob).to_hex().as_str() != hash {
                    return Err(ObjectStoreError::InvalidPayload(format!(
                        "blob does not match locator {}",
                        hash
                    )));
                }
                Ok(Some(blob))
            }
            Backend::Http(endpoint) => endpoint.download(locator.as_str()).await,
        }
    }

    /// Delete a blob, returning whether it existed.
    ///
    /// The HTTP endpoint has no delete call, so this is an error there.
    pub async fn delete(&self, locator: &Locator) -> Result<bool> {
        match &self.backend {
            Backend::Storage(storage) => {
                let hash = Self::check_hash_locator(locator)?;
                storage.delete_blob(hash).await
            }
            Backend::Http(_) => Err(ObjectStoreError::InvalidConfig(
                "http endpoints do not support deletion".to_string(),
            )),
        }
    }

    fn check_hash_locator(locator: &Locator) -> Result<&str> {
        let hash = locator.as_str();
        if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ObjectStoreError::InvalidLocator(hash.to_string()));
        }
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ephemeral_store() {
        let store = ObjectStore::new_ephemeral().await.unwrap();

        let blob = Bytes::from_static(b"ciphertext bytes");
        let locator = store.put("aa", blob.clone()).await.unwrap();

        assert_eq!(
            locator.as_str(),
            blake3::hash(&blob).to_hex().as_str(),
            "locator is the content hash of the stored bytes"
        );
        assert_eq!(store.get(&locator).await.unwrap(), Some(blob));
    }

    #[tokio::test]
    async fn test_local_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new_local(temp_dir.path()).await.unwrap();

        let locator = store
            .put("bb", Bytes::from_static(b"local blob"))
            .await
            .unwrap();

        // a second handle on the same directory sees the blob
        let reopened = ObjectStore::new_local(temp_dir.path()).await.unwrap();
        let blob = reopened.get(&locator).await.unwrap().unwrap();
        assert_eq!(blob.as_ref(), b"local blob");
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = ObjectStore::new_ephemeral().await.unwrap();
        let locator: Locator = "0".repeat(64).parse().unwrap();
        assert!(store.get(&locator).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_content_same_locator() {
        let store = ObjectStore::new_ephemeral().await.unwrap();
        let a = store.put("one", Bytes::from_static(b"x")).await.unwrap();
        let b = store.put("two", Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = ObjectStore::new_ephemeral().await.unwrap();
        let locator = store.put("cc", Bytes::from_static(b"gone")).await.unwrap();
        assert!(store.delete(&locator).await.unwrap());
        assert!(store.get(&locator).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_like_locators() {
        let store = ObjectStore::new_ephemeral().await.unwrap();
        let locator: Locator = "../../etc/passwd".parse().unwrap();
        let result = store.get(&locator).await;
        assert!(matches!(result, Err(ObjectStoreError::InvalidLocator(_))));
    }

    #[test]
    fn test_locator_parse() {
        assert!("".parse::<Locator>().is_err());
        assert!("abc:def".parse::<Locator>().is_err());
        let locator: Locator = " abc ".parse().unwrap();
        assert_eq!(locator.to_string(), "abc");
    }
}
