use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};

use super::provider::{
    ConfirmStorage, EventFilter, EventLedger, EventStream, FromHeight, StorageConfirmed, TxReceipt,
};

const CHANNEL_CAPACITY: usize = 1024;

/// In-process event ledger; each submitted transaction becomes a new block
#[derive(Debug, Clone)]
pub struct MemoryEventLedger {
    inner: Arc<Mutex<MemoryEventLedgerInner>>,
    sender: broadcast::Sender<StorageConfirmed>,
}

#[derive(Debug, Default)]
struct MemoryEventLedgerInner {
    events: Vec<StorageConfirmed>,
    head: u64,
    offline: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryEventLedgerError {
    #[error("ledger is offline")]
    Offline,
    #[error("transaction confirms no shards")]
    EmptyTransaction,
    #[error("subscriber fell behind by {0} events")]
    Lagged(u64),
}

impl MemoryEventLedger {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(MemoryEventLedgerInner::default())),
            sender,
        }
    }

    /// Simulate losing (or regaining) the connection to the ledger
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn check_online(inner: &MemoryEventLedgerInner) -> Result<(), MemoryEventLedgerError> {
        if inner.offline {
            return Err(MemoryEventLedgerError::Offline);
        }
        Ok(())
    }
}

impl Default for MemoryEventLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLedger for MemoryEventLedger {
    type Error = MemoryEventLedgerError;

    async fn submit(&self, tx: ConfirmStorage) -> Result<TxReceipt, Self::Error> {
        if tx.shard_ids.is_empty() {
            return Err(MemoryEventLedgerError::EmptyTransaction);
        }

        let mut inner = self.inner.lock();
        Self::check_online(&inner)?;

        inner.head += 1;
        let block_height = inner.head;
        for shard_id in &tx.shard_ids {
            let event = StorageConfirmed {
                shard_id: shard_id.clone(),
                attesting_party: tx.attesting_party.clone(),
                block_height,
            };
            inner.events.push(event.clone());
            // no receivers is fine
            let _ = self.sender.send(event);
        }

        Ok(TxReceipt::new(&tx, block_height))
    }

    async fn watch(&self, filter: EventFilter) -> Result<EventStream<Self::Error>, Self::Error> {
        // snapshot and subscribe under the same lock so nothing is missed or repeated
        let (history, receiver) = {
            let inner = self.inner.lock();
            Self::check_online(&inner)?;
            let history: Vec<_> = match filter.from {
                FromHeight::Latest => Vec::new(),
                FromHeight::Height(from) => inner
                    .events
                    .iter()
                    .filter(|event| event.block_height >= from && filter.matches(event))
                    .cloned()
                    .collect(),
            };
            (history, self.sender.subscribe())
        };

        let live = futures::stream::unfold(
            (receiver, filter),
            |(mut receiver, filter)| async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) if filter.matches(&event) => {
                            return Some((Ok(event), (receiver, filter)))
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(missed)) => {
                            return Some((
                                Err(MemoryEventLedgerError::Lagged(missed)),
                                (receiver, filter),
                            ))
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            },
        );

        Ok(futures::stream::iter(history.into_iter().map(Ok))
            .chain(live)
            .boxed())
    }

    async fn query(&self, filter: EventFilter) -> Result<Vec<StorageConfirmed>, Self::Error> {
        let inner = self.inner.lock();
        Self::check_online(&inner)?;
        let from = match filter.from {
            FromHeight::Latest => inner.head,
            FromHeight::Height(from) => from,
        };
        Ok(inner
            .events
            .iter()
            .filter(|event| event.block_height >= from && filter.matches(event))
            .cloned()
            .collect())
    }

    async fn head(&self) -> Result<u64, Self::Error> {
        let inner = self.inner.lock();
        Self::check_online(&inner)?;
        Ok(inner.head)
    }
}
