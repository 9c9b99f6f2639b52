use object_store::Locator;

use super::id::ShardId;
use super::remote::{RemoteShardStore, RetrievalCapability};
use crate::config::KeySplitConfig;
use crate::crypto::{
    CipherError, CustodyKey, CustodyKeyError, EncryptedShard, Mnemonic, MnemonicCodec,
    MnemonicError, Password, ShardCipher,
};
use crate::ledger::{keys, Ledger, LedgerError, LocalLedgerProvider};

#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("shard not found: {0}")]
    NotFound(String),
    /// The password does not decrypt the locally stored shard
    #[error("wrong password")]
    WrongPassword,
    /// The custody key does not decrypt the remote blob
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("no password supplied and no default password configured")]
    MissingPassword,
    #[error("invalid retrieval capability: {0}")]
    InvalidCapability(String),
    #[error("shard mnemonic error: {0}")]
    Mnemonic(#[from] MnemonicError),
    #[error("local ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("custody error: {0}")]
    Default(#[from] anyhow::Error),
}

impl From<CustodyKeyError> for CustodyError {
    fn from(e: CustodyKeyError) -> Self {
        match e {
            CustodyKeyError::DecryptionFailed => CustodyError::DecryptionFailed,
            CustodyKeyError::InvalidKey(msg) => CustodyError::InvalidCapability(msg),
            CustodyKeyError::Default(e) => CustodyError::Default(e),
        }
    }
}

/// Result of handing a shard to a remote custodian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRecord {
    pub shard_id: ShardId,
    pub locator: Locator,
    /// Random key the blob was encrypted under; never stored with it
    pub key: CustodyKey,
}

impl ShardRecord {
    pub fn capability(&self) -> RetrievalCapability {
        RetrievalCapability {
            locator: self.locator.clone(),
            key: self.key.clone(),
        }
    }
}

/// Lifecycle of individual shards: local encrypted copies, remote custody
///  and the per-account bookkeeping of both
///
/// Every shard is identified by [`ShardId`] over its canonical bytes, the
///  padded share exactly as the mnemonic encodes it.
#[derive(Debug, Clone)]
pub struct ShardCustodyStore<L, R> {
    account: String,
    ledger: Ledger<L>,
    remote: R,
    codec: MnemonicCodec,
    cipher: ShardCipher,
    password: Option<Password>,
}

impl<L: LocalLedgerProvider, R: RemoteShardStore> ShardCustodyStore<L, R> {
    pub fn new(config: &KeySplitConfig, ledger: Ledger<L>, remote: R) -> Self {
        Self {
            account: config.account.clone(),
            ledger,
            remote,
            codec: config.codec(),
            cipher: config.cipher(),
            password: config.password.clone(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn ledger(&self) -> &Ledger<L> {
        &self.ledger
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Content identifier of canonical share bytes
    pub fn identify(&self, share: &[u8]) -> ShardId {
        ShardId::from_share_bytes(share)
    }

    /// Identifier of a share given as a mnemonic
    pub fn identify_mnemonic(&self, share: &Mnemonic) -> Result<ShardId, CustodyError> {
        Ok(self.identify(&self.codec.decode(share)?))
    }

    fn password<'a>(&'a self, explicit: Option<&'a Password>) -> Result<&'a Password, CustodyError> {
        explicit
            .or(self.password.as_ref())
            .ok_or(CustodyError::MissingPassword)
    }

    /// Encrypt a share under the password and keep it in the local ledger
    ///
    /// Persisting the same share twice overwrites the blob and leaves the
    ///  held list unchanged.
    pub async fn persist_local(
        &self,
        share: &Mnemonic,
        password: Option<&Password>,
    ) -> Result<ShardId, CustodyError> {
        let password = self.password(password)?;
        let bytes = self.codec.decode(share)?;
        let shard_id = self.identify(&bytes);

        let encrypted = self.cipher.protect(&bytes, password).await.map_err(|e| match e {
            CipherError::DecryptionFailed => CustodyError::DecryptionFailed,
            CipherError::Default(e) => CustodyError::Default(e),
        })?;
        self.ledger
            .set(&keys::encrypted_shard(shard_id.as_str()), &encrypted)
            .await?;
        self.ledger
            .append_unique(&keys::held_shards(&self.account), shard_id.as_str())
            .await?;

        tracing::debug!(shard_id = %shard_id, "shard persisted locally");
        Ok(shard_id)
    }

    /// Decrypt a locally persisted shard back into its mnemonic
    pub async fn fetch_local(
        &self,
        shard_id: &ShardId,
        password: Option<&Password>,
    ) -> Result<Mnemonic, CustodyError> {
        let password = self.password(password)?;
        let encrypted: EncryptedShard = self
            .ledger
            .get(&keys::encrypted_shard(shard_id.as_str()))
            .await?
            .ok_or_else(|| CustodyError::NotFound(shard_id.to_string()))?;

        let bytes = self
            .cipher
            .reveal(&encrypted, password)
            .await
            .map_err(|e| match e {
                CipherError::DecryptionFailed => {
                    tracing::warn!(shard_id = %shard_id, "local shard rejected password");
                    CustodyError::WrongPassword
                }
                CipherError::Default(e) => CustodyError::Default(e),
            })?;

        Ok(self.codec.encode(&bytes)?)
    }

    /// Delete a locally persisted shard, returning whether it existed
    pub async fn remove_local(&self, shard_id: &ShardId) -> Result<bool, CustodyError> {
        let removed = self
            .ledger
            .remove(&keys::encrypted_shard(shard_id.as_str()))
            .await?;
        let listed = self
            .ledger
            .remove_from_list(&keys::held_shards(&self.account), shard_id.as_str())
            .await?;

        if removed || listed {
            tracing::debug!(shard_id = %shard_id, "local shard removed");
        }
        Ok(removed || listed)
    }

    /// Encrypt a share under a fresh custody key and hand it to the remote store
    ///
    /// The shard is recorded as owned only once the store accepted it.
    pub async fn upload_remote(&self, share: &Mnemonic) -> Result<ShardRecord, CustodyError> {
        let bytes = self.codec.decode(share)?;
        let shard_id = self.identify(&bytes);

        let key = CustodyKey::generate()?;
        let blob = key.encrypt(&bytes)?;
        let locator = self
            .remote
            .put(&shard_id, blob.into())
            .await
            .map_err(|e| CustodyError::StorageUnavailable(e.to_string()))?;

        self.ledger
            .append_unique(&keys::owned_shards(&self.account), shard_id.as_str())
            .await?;

        tracing::info!(shard_id = %shard_id, locator = %locator, "shard uploaded");
        Ok(ShardRecord {
            shard_id,
            locator,
            key,
        })
    }

    /// Fetch and decrypt a remotely stored shard
    pub async fn download_remote(
        &self,
        locator: &Locator,
        key: &CustodyKey,
    ) -> Result<Mnemonic, CustodyError> {
        let blob = self
            .remote
            .get(locator)
            .await
            .map_err(|e| CustodyError::StorageUnavailable(e.to_string()))?
            .ok_or_else(|| CustodyError::NotFound(locator.to_string()))?;

        let bytes = key.decrypt(&blob).inspect_err(|_| {
            tracing::warn!(locator = %locator, "remote shard rejected custody key");
        })?;

        tracing::debug!(locator = %locator, "shard downloaded");
        Ok(self.codec.encode(&bytes)?)
    }

    /// [`Self::download_remote`] driven by a `<locator>:<key>` capability string
    pub async fn download_capability(&self, capability: &str) -> Result<Mnemonic, CustodyError> {
        let capability: RetrievalCapability = capability
            .parse()
            .map_err(|e: super::remote::InvalidCapability| CustodyError::InvalidCapability(e.0))?;
        self.download_remote(&capability.locator, &capability.key)
            .await
    }

    /// Shards this account uploaded
    pub async fn owned_shards(&self) -> Result<Vec<ShardId>, CustodyError> {
        self.shard_list(&keys::owned_shards(&self.account)).await
    }

    /// Shards this account keeps locally
    pub async fn held_shards(&self) -> Result<Vec<ShardId>, CustodyError> {
        self.shard_list(&keys::held_shards(&self.account)).await
    }

    async fn shard_list(&self, key: &str) -> Result<Vec<ShardId>, CustodyError> {
        let ids = self
            .ledger
            .list(key)
            .await?
            .into_iter()
            .filter_map(|raw| match raw.parse::<ShardId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping malformed shard id");
                    None
                }
            })
            .collect();
        Ok(ids)
    }
}
