use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::provider::{
    ConfirmStorage, EventFilter, EventLedger, EventStream, FromHeight, StorageConfirmed, TxReceipt,
};

/// Default interval between polls of the journal while watching
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Event ledger kept as an append-only JSON-lines file
///
/// Each line is one [`StorageConfirmed`]; a block is the set of lines sharing
///  a height. Watchers poll the file, so separate processes sharing the same
///  journal observe each other's confirmations.
#[derive(Debug, Clone)]
pub struct JournalEventLedger {
    path: PathBuf,
    poll_interval: Duration,
    write_lock: Arc<Mutex<()>>,
}

#[derive(thiserror::Error, Debug)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed journal line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },
    #[error("transaction confirms no shards")]
    EmptyTransaction,
}

impl JournalEventLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<StorageConfirmed>, JournalError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        data.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|source| JournalError::Malformed {
                    line: index + 1,
                    source,
                })
            })
            .collect()
    }

    fn head_of(events: &[StorageConfirmed]) -> u64 {
        events.iter().map(|e| e.block_height).max().unwrap_or(0)
    }
}

#[async_trait]
impl EventLedger for JournalEventLedger {
    type Error = JournalError;

    async fn submit(&self, tx: ConfirmStorage) -> Result<TxReceipt, Self::Error> {
        if tx.shard_ids.is_empty() {
            return Err(JournalError::EmptyTransaction);
        }

        let _guard = self.write_lock.lock().await;
        let block_height = Self::head_of(&self.read_all().await?) + 1;

        let mut block = String::new();
        for shard_id in &tx.shard_ids {
            let event = StorageConfirmed {
                shard_id: shard_id.clone(),
                attesting_party: tx.attesting_party.clone(),
                block_height,
            };
            let line = serde_json::to_string(&event)
                .map_err(|source| JournalError::Malformed { line: 0, source })?;
            block.push_str(&line);
            block.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // one write per block keeps blocks whole for concurrent readers
        file.write_all(block.as_bytes()).await?;
        file.flush().await?;

        Ok(TxReceipt::new(&tx, block_height))
    }

    async fn watch(&self, filter: EventFilter) -> Result<EventStream<Self::Error>, Self::Error> {
        let next_height = match filter.from {
            FromHeight::Latest => Self::head_of(&self.read_all().await?) + 1,
            FromHeight::Height(from) => from,
        };

        struct Cursor {
            ledger: JournalEventLedger,
            filter: EventFilter,
            next_height: u64,
            pending: VecDeque<StorageConfirmed>,
            first_poll: bool,
        }

        let cursor = Cursor {
            ledger: self.clone(),
            filter,
            next_height,
            pending: VecDeque::new(),
            first_poll: true,
        };

        let stream = futures::stream::unfold(cursor, |mut cursor| async move {
            loop {
                if let Some(event) = cursor.pending.pop_front() {
                    return Some((Ok(event), cursor));
                }
                if !cursor.first_poll {
                    tokio::time::sleep(cursor.ledger.poll_interval).await;
                }
                cursor.first_poll = false;

                let events = match cursor.ledger.read_all().await {
                    Ok(events) => events,
                    Err(e) => return Some((Err(e), cursor)),
                };
                let head = Self::head_of(&events);
                if head < cursor.next_height {
                    continue;
                }
                cursor.pending.extend(events.into_iter().filter(|event| {
                    event.block_height >= cursor.next_height && cursor.filter.matches(event)
                }));
                cursor.next_height = head + 1;
            }
        });

        Ok(stream.boxed())
    }

    async fn query(&self, filter: EventFilter) -> Result<Vec<StorageConfirmed>, Self::Error> {
        let events = self.read_all().await?;
        let from = match filter.from {
            FromHeight::Latest => Self::head_of(&events),
            FromHeight::Height(from) => from,
        };
        Ok(events
            .into_iter()
            .filter(|event| event.block_height >= from && filter.matches(event))
            .collect())
    }

    async fn head(&self) -> Result<u64, Self::Error> {
        Ok(Self::head_of(&self.read_all().await?))
    }
}
