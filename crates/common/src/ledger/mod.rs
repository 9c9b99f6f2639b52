//! Local ledger: the durable record of which shards an account owns or holds
//!
//! Providers store strings under string keys. [`Ledger`] adds typed JSON
//! access on top and serialises read-modify-write cycles per key, so two
//! concurrent appends to the same list never lose an update while writers to
//! different keys never wait on each other.

mod file;
mod memory;
mod provider;

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub use file::{FileLedger, FileLedgerError};
pub use memory::{MemoryLedger, MemoryLedgerError};
pub use provider::LocalLedgerProvider;

/// Key layout inside the local ledger
pub mod keys {
    /// Shards split and uploaded by `account`
    pub fn owned_shards(account: &str) -> String {
        format!("{}:shards", account)
    }

    /// Shards `account` is holding locally, for itself or for others
    pub fn held_shards(account: &str) -> String {
        format!("{}:heldShards", account)
    }

    /// Latest storage confirmation observed for a shard
    pub fn confirmation(shard_id: &str) -> String {
        format!("shard:{}", shard_id)
    }

    /// Password encrypted shard blob
    pub fn encrypted_shard(shard_id: &str) -> String {
        format!("encShard:{}", shard_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger provider error: {0}")]
    Provider(String),
    #[error("malformed value under {key}: {source}")]
    Malformed {
        key: String,
        source: serde_json::Error,
    },
}

/// Critical section for one key; the key's lock is freed once nobody else
///  holds or waits on it
struct KeyGuard {
    locks: Arc<parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    key: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock();
        let ours = locks
            .get(&self.key)
            .map_or(false, |lock| Arc::ptr_eq(lock, &self.lock));
        // the map's handle and ours
        if ours && Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Typed access to a [`LocalLedgerProvider`] with per-key write serialisation
#[derive(Debug, Clone)]
pub struct Ledger<P> {
    provider: P,
    locks: Arc<parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<P: LocalLedgerProvider> Ledger<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            locks: Arc::new(parking_lot::Mutex::new(HashMap::new())),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Enter the critical section for `key`
    async fn lock(&self, key: &str) -> KeyGuard {
        let lock = self
            .locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        let guard = lock.clone().lock_owned().await;
        KeyGuard {
            locks: self.locks.clone(),
            key: key.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Keys with a critical section currently allocated
    #[cfg(test)]
    fn locked_keys(&self) -> usize {
        self.locks.lock().len()
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LedgerError> {
        let Some(raw) = self
            .provider
            .get(key)
            .await
            .map_err(|e| LedgerError::Provider(e.to_string()))?
        else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| LedgerError::Malformed {
                key: key.to_string(),
                source,
            })
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LedgerError> {
        let raw = serde_json::to_string(value).map_err(|source| LedgerError::Malformed {
            key: key.to_string(),
            source,
        })?;
        self.provider
            .set(key, raw)
            .await
            .map_err(|e| LedgerError::Provider(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LedgerError> {
        self.read(key).await
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LedgerError> {
        let _guard = self.lock(key).await;
        self.write(key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<bool, LedgerError> {
        let _guard = self.lock(key).await;
        self.provider
            .remove(key)
            .await
            .map_err(|e| LedgerError::Provider(e.to_string()))
    }

    /// Read-modify-write `key` inside its critical section
    ///
    /// `f` sees the current value and returns the value to store, or `None`
    ///  to leave the key untouched. Returns whether a write happened.
    pub async fn update<T, F>(&self, key: &str, f: F) -> Result<bool, LedgerError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Option<T> + Send,
    {
        let _guard = self.lock(key).await;

        let mut f = Some(f);
        let mut failure = None;
        let mut apply = |raw: Option<String>| -> Option<String> {
            let f = f.take()?;
            let current = match raw.map(|raw| serde_json::from_str::<T>(&raw)).transpose() {
                Ok(current) => current,
                Err(source) => {
                    failure = Some(LedgerError::Malformed {
                        key: key.to_string(),
                        source,
                    });
                    return None;
                }
            };
            match serde_json::to_string(&f(current)?) {
                Ok(raw) => Some(raw),
                Err(source) => {
                    failure = Some(LedgerError::Malformed {
                        key: key.to_string(),
                        source,
                    });
                    None
                }
            }
        };

        let written = self
            .provider
            .update(key, &mut apply)
            .await
            .map_err(|e| LedgerError::Provider(e.to_string()))?;
        match failure {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// The string list stored under `key`, empty if absent
    pub async fn list(&self, key: &str) -> Result<Vec<String>, LedgerError> {
        Ok(self.read(key).await?.unwrap_or_default())
    }

    /// Append `item` to the list under `key` unless already present
    ///
    /// Returns whether the item was added.
    pub async fn append_unique(&self, key: &str, item: &str) -> Result<bool, LedgerError> {
        self.update(key, |list: Option<Vec<String>>| {
            let mut list = list.unwrap_or_default();
            if list.iter().any(|existing| existing == item) {
                return None;
            }
            list.push(item.to_string());
            Some(list)
        })
        .await
    }

    /// Remove `item` from the list under `key`, returning whether it was present
    pub async fn remove_from_list(&self, key: &str, item: &str) -> Result<bool, LedgerError> {
        self.update(key, |list: Option<Vec<String>>| {
            let mut list = list?;
            let before = list.len();
            list.retain(|existing| existing != item);
            (list.len() != before).then_some(list)
        })
        .await
    }
}
