use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use tokio::sync::Mutex;

use super::provider::LocalLedgerProvider;

type Entries = BTreeMap<String, String>;

/// Local ledger persisted as a single JSON object on disk
///
/// Every change takes an exclusive advisory lock on `<path>.lock`, re-reads
///  the document, applies the one key change and writes it to a sibling
///  temporary file renamed over the original. Several processes can share
///  one file without losing each other's writes, and a crash mid-write
///  leaves the previous version intact. Reads take no lock.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

#[derive(thiserror::Error, Debug)]
pub enum FileLedgerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed ledger file: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Held while a process owns the ledger file
struct FileLock(std::fs::File);

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileLedger {
    /// Open the ledger at `path`, starting empty if the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, FileLedgerError> {
        let path = path.as_ref().to_path_buf();
        Self::read_entries(&path).await?;

        Ok(Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    async fn read_entries(path: &Path) -> Result<Entries, FileLedgerError> {
        match tokio::fs::read(path).await {
            Ok(data) if data.is_empty() => Ok(BTreeMap::new()),
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn lock_file(&self) -> Result<FileLock, FileLedgerError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let lock_path = self.lock_path();
        let file = tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok::<_, std::io::Error>(file)
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        Ok(FileLock(file))
    }

    async fn flush(&self, entries: &Entries) -> Result<(), FileLedgerError> {
        let data = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `change` to the current document under the file lock
    ///
    /// `change` returns `None` when it left the entries untouched, in which
    ///  case nothing is written.
    async fn mutate<R, F>(&self, change: F) -> Result<Option<R>, FileLedgerError>
    where
        F: FnOnce(&mut Entries) -> Option<R> + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let _lock = self.lock_file().await?;

        let mut entries = Self::read_entries(&self.path).await?;
        let Some(result) = change(&mut entries) else {
            return Ok(None);
        };
        self.flush(&entries).await?;
        Ok(Some(result))
    }
}

#[async_trait]
impl LocalLedgerProvider for FileLedger {
    type Error = FileLedgerError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(Self::read_entries(&self.path).await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
            Some(())
        })
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, Self::Error> {
        let removed = self
            .mutate(|entries| entries.remove(key).map(|_| ()))
            .await?;
        Ok(removed.is_some())
    }

    async fn update(
        &self,
        key: &str,
        f: &mut (dyn FnMut(Option<String>) -> Option<String> + Send),
    ) -> Result<bool, Self::Error> {
        let written = self
            .mutate(|entries| {
                let next = f(entries.get(key).cloned())?;
                entries.insert(key.to_string(), next);
                Some(())
            })
            .await?;
        Ok(written.is_some())
    }
}
