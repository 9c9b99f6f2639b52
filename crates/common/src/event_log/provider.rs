use std::fmt::{Debug, Display};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::shard::ShardId;

/// A custodian's attestation that it stores a shard, as recorded on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfirmed {
    pub shard_id: ShardId,
    pub attesting_party: String,
    pub block_height: u64,
}

/// Transaction confirming storage of one or more shards
///
/// Every shard id in a transaction is confirmed in the same block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmStorage {
    pub shard_ids: Vec<ShardId>,
    pub attesting_party: String,
}

/// Receipt for a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Hex BLAKE3 digest identifying the transaction
    pub tx_hash: String,
    /// Block the transaction was included in
    pub block_height: u64,
    /// Number of `StorageConfirmed` events emitted
    pub events: usize,
}

impl TxReceipt {
    pub(crate) fn new(tx: &ConfirmStorage, block_height: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&block_height.to_be_bytes());
        hasher.update(tx.attesting_party.as_bytes());
        for shard_id in &tx.shard_ids {
            hasher.update(shard_id.as_str().as_bytes());
        }
        Self {
            tx_hash: hasher.finalize().to_hex().to_string(),
            block_height,
            events: tx.shard_ids.len(),
        }
    }
}

/// Where a watch or query starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FromHeight {
    /// Only events in blocks after the current head
    #[default]
    Latest,
    /// Every event at this height or above
    Height(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    /// Restrict to one shard, or every shard if `None`
    pub shard_id: Option<ShardId>,
    pub from: FromHeight,
}

impl EventFilter {
    pub fn shard(shard_id: ShardId) -> Self {
        Self {
            shard_id: Some(shard_id),
            from: FromHeight::Latest,
        }
    }

    pub fn from_height(mut self, height: u64) -> Self {
        self.from = FromHeight::Height(height);
        self
    }

    /// Whether `event` is for the filtered shard; heights are the ledger's concern
    pub fn matches(&self, event: &StorageConfirmed) -> bool {
        self.shard_id
            .as_ref()
            .map_or(true, |shard_id| *shard_id == event.shard_id)
    }
}

pub type EventStream<E> = BoxStream<'static, Result<StorageConfirmed, E>>;

/// Append-only log of storage confirmations, ordered by block height
///
/// Dropping a stream returned by [`EventLedger::watch`] must release the
///  underlying subscription.
#[async_trait]
pub trait EventLedger: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send + Sync + 'static;

    /// Submit a confirmation transaction and wait for its inclusion
    async fn submit(&self, tx: ConfirmStorage) -> Result<TxReceipt, Self::Error>;

    /// Subscribe to matching events
    ///
    /// With [`FromHeight::Height`] the stream first replays matching history
    ///  from that height, then follows new blocks.
    async fn watch(&self, filter: EventFilter) -> Result<EventStream<Self::Error>, Self::Error>;

    /// Matching events already on the ledger, in block order
    async fn query(&self, filter: EventFilter) -> Result<Vec<StorageConfirmed>, Self::Error>;

    /// Height of the most recent block, 0 for an empty ledger
    async fn head(&self) -> Result<u64, Self::Error>;
}
