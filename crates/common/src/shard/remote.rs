use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{Locator, ObjectStore, ObjectStoreError};

use super::id::ShardId;
use crate::crypto::CustodyKey;

/// Where remote custody blobs are put and fetched
///
/// The store sees only ciphertext; it never receives the custody key.
#[async_trait]
pub trait RemoteShardStore: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send + Sync + 'static;

    async fn put(&self, shard_id: &ShardId, blob: Bytes) -> Result<Locator, Self::Error>;

    /// `Ok(None)` when the store holds nothing under `locator`
    async fn get(&self, locator: &Locator) -> Result<Option<Bytes>, Self::Error>;
}

#[async_trait]
impl RemoteShardStore for ObjectStore {
    type Error = ObjectStoreError;

    async fn put(&self, shard_id: &ShardId, blob: Bytes) -> Result<Locator, Self::Error> {
        ObjectStore::put(self, shard_id.as_str(), blob).await
    }

    async fn get(&self, locator: &Locator) -> Result<Option<Bytes>, Self::Error> {
        ObjectStore::get(self, locator).await
    }
}

/// Everything a retrieving party needs to fetch and decrypt one remote shard
///
/// Rendered as `<locator>:<base64 key>`; whoever holds this string can read
///  the shard, so it is handed over out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalCapability {
    pub locator: Locator,
    pub key: CustodyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid retrieval capability: {0}")]
pub struct InvalidCapability(pub String);

impl Display for RetrievalCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.locator, self.key.to_base64())
    }
}

impl FromStr for RetrievalCapability {
    type Err = InvalidCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (locator, key) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| InvalidCapability("expected <locator>:<key>".to_string()))?;
        let locator = locator
            .parse()
            .map_err(|e: ObjectStoreError| InvalidCapability(e.to_string()))?;
        let key = CustodyKey::from_base64(key).map_err(|e| InvalidCapability(e.to_string()))?;
        Ok(Self { locator, key })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_capability_roundtrip() {
        let capability = RetrievalCapability {
            locator: "a".repeat(64).parse().unwrap(),
            key: CustodyKey::generate().unwrap(),
        };
        let rendered = capability.to_string();
        assert!(rendered.starts_with(&"a".repeat(64)));
        assert_eq!(rendered.parse::<RetrievalCapability>().unwrap(), capability);
    }

    #[test]
    fn test_capability_rejects_garbage() {
        assert!("no-separator".parse::<RetrievalCapability>().is_err());
        assert!(":key".parse::<RetrievalCapability>().is_err());
        assert!("locator:not-a-key".parse::<RetrievalCapability>().is_err());
    }

    #[tokio::test]
    async fn test_object_store_as_remote() {
        let store = ObjectStore::new_ephemeral().await.unwrap();
        let shard_id = ShardId::from_share_bytes(b"share");
        let locator = RemoteShardStore::put(&store, &shard_id, Bytes::from_static(b"blob"))
            .await
            .unwrap();
        let blob = RemoteShardStore::get(&store, &locator).await.unwrap();
        assert_eq!(blob, Some(Bytes::from_static(b"blob")));
    }
}
