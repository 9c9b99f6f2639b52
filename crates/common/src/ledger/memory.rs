use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::provider::LocalLedgerProvider;

/// In-memory local ledger, lost when the last clone is dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryLedgerError {
    #[error("memory ledger error: {0}")]
    Internal(String),
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LocalLedgerProvider for MemoryLedger {
    type Error = MemoryLedgerError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let inner = self.inner.read().map_err(|e| {
            MemoryLedgerError::Internal(format!("failed to acquire read lock: {}", e))
        })?;
        Ok(inner.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        let mut inner = self.inner.write().map_err(|e| {
            MemoryLedgerError::Internal(format!("failed to acquire write lock: {}", e))
        })?;
        inner.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, Self::Error> {
        let mut inner = self.inner.write().map_err(|e| {
            MemoryLedgerError::Internal(format!("failed to acquire write lock: {}", e))
        })?;
        Ok(inner.remove(key).is_some())
    }
}
