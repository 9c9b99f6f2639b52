use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::KeySplitConfig;
use crate::event_log::{ConfirmStorage, EventFilter, EventLedger, StorageConfirmed, TxReceipt};
use crate::ledger::{keys, Ledger, LedgerError, LocalLedgerProvider};
use crate::shard::ShardId;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("event ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("watch cancelled")]
    Cancelled,
    /// The ledger ended the subscription before a matching event arrived
    #[error("event stream closed before a confirmation arrived")]
    WatchClosed,
    #[error("local ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

fn unavailable(e: impl std::fmt::Display) -> TrackerError {
    TrackerError::LedgerUnavailable(e.to_string())
}

/// Latest known attestation that a custodian stores a shard
///
/// A cache of what the event ledger says; it can always be rebuilt by
///  re-querying history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub shard_id: ShardId,
    pub block_height: u64,
    pub attesting_party: String,
    /// When this process recorded the event
    pub observed_at: DateTime<Utc>,
}

impl ConfirmationRecord {
    fn observed(event: &StorageConfirmed) -> Self {
        Self {
            shard_id: event.shard_id.clone(),
            block_height: event.block_height,
            attesting_party: event.attesting_party.clone(),
            observed_at: Utc::now(),
        }
    }
}

/// An owned shard and its cached confirmation, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStatus {
    pub shard_id: ShardId,
    pub confirmation: Option<ConfirmationRecord>,
}

impl ShardStatus {
    pub fn is_confirmed(&self) -> bool {
        self.confirmation.is_some()
    }
}

/// Follows storage confirmations on the event ledger and caches the most
///  advanced one per shard in the local ledger
///
/// Per shard the state only moves forward: `Unconfirmed -> Confirmed(h)`, then
///  `Confirmed(h) -> Confirmed(h')` only for `h' > h`. Nothing here retries;
///  ledger failures surface as [`TrackerError::LedgerUnavailable`].
#[derive(Debug, Clone)]
pub struct ConfirmationTracker<E, L> {
    account: String,
    events: E,
    ledger: Ledger<L>,
}

impl<E: EventLedger, L: LocalLedgerProvider> ConfirmationTracker<E, L> {
    pub fn new(config: &KeySplitConfig, ledger: Ledger<L>, events: E) -> Self {
        Self {
            account: config.account.clone(),
            events,
            ledger,
        }
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// The cached confirmation for `shard_id`, without touching the event ledger
    pub async fn cached(
        &self,
        shard_id: &ShardId,
    ) -> Result<Option<ConfirmationRecord>, TrackerError> {
        Ok(self
            .ledger
            .get(&keys::confirmation(shard_id.as_str()))
            .await?)
    }

    /// Store `record` unless the cache already holds an equal or higher block
    ///
    /// Returns whether the cache advanced.
    async fn record(&self, record: &ConfirmationRecord) -> Result<bool, TrackerError> {
        let advanced = self
            .ledger
            .update(
                &keys::confirmation(record.shard_id.as_str()),
                |current: Option<ConfirmationRecord>| match current {
                    Some(current) if current.block_height >= record.block_height => None,
                    _ => Some(record.clone()),
                },
            )
            .await?;

        if advanced {
            tracing::info!(
                shard_id = %record.shard_id,
                block_height = record.block_height,
                attesting_party = %record.attesting_party,
                "storage confirmation recorded"
            );
        }
        Ok(advanced)
    }

    /// Wait for the next confirmation of `shard_id`, record it and return it
    ///
    /// Single shot: the ledger subscription is released as soon as the first
    ///  matching event arrives, or when this future is dropped.
    pub async fn watch_once(&self, shard_id: &ShardId) -> Result<ConfirmationRecord, TrackerError> {
        let mut stream = self
            .events
            .watch(EventFilter::shard(shard_id.clone()))
            .await
            .map_err(unavailable)?;
        tracing::debug!(shard_id = %shard_id, "watching for storage confirmation");

        let event = stream
            .next()
            .await
            .ok_or(TrackerError::WatchClosed)?
            .map_err(unavailable)?;
        drop(stream);

        let record = ConfirmationRecord::observed(&event);
        self.record(&record).await?;
        Ok(record)
    }

    /// [`Self::watch_once`] that gives up with [`TrackerError::Cancelled`] once
    ///  `shutdown` completes, tearing the subscription down
    pub async fn watch_once_until<F>(
        &self,
        shard_id: &ShardId,
        shutdown: F,
    ) -> Result<ConfirmationRecord, TrackerError>
    where
        F: Future,
    {
        tokio::select! {
            result = self.watch_once(shard_id) => result,
            _ = shutdown => {
                tracing::debug!(shard_id = %shard_id, "confirmation watch cancelled");
                Err(TrackerError::Cancelled)
            }
        }
    }

    /// Catch the cache up with the ledger's history for `shard_id`
    ///
    /// Queries from the cached block height (genesis when nothing is cached)
    ///  and returns the most advanced record known, cached or new.
    pub async fn query_history(
        &self,
        shard_id: &ShardId,
    ) -> Result<Option<ConfirmationRecord>, TrackerError> {
        let mut best = self.cached(shard_id).await?;
        let from = best.as_ref().map(|r| r.block_height).unwrap_or(0);

        let events = self
            .events
            .query(EventFilter::shard(shard_id.clone()).from_height(from))
            .await
            .map_err(unavailable)?;

        for event in events {
            let height = best.as_ref().map(|r| r.block_height);
            if height.is_some_and(|height| event.block_height <= height) {
                continue;
            }
            let record = ConfirmationRecord::observed(&event);
            if self.record(&record).await? {
                best = Some(record);
            } else {
                // someone else cached a higher block meanwhile
                best = self.cached(shard_id).await?;
            }
        }

        Ok(best)
    }

    /// Submit a confirmation for `shard_ids` as `attesting_party` and wait for
    ///  every resulting event
    ///
    /// The subscription is opened before submitting so no event can slip
    ///  between the two.
    pub async fn confirm_storage(
        &self,
        shard_ids: &[ShardId],
        attesting_party: &str,
    ) -> Result<(TxReceipt, Vec<ConfirmationRecord>), TrackerError> {
        let mut stream = self
            .events
            .watch(EventFilter::default())
            .await
            .map_err(unavailable)?;

        let receipt = self
            .events
            .submit(ConfirmStorage {
                shard_ids: shard_ids.to_vec(),
                attesting_party: attesting_party.to_string(),
            })
            .await
            .map_err(unavailable)?;

        let mut pending: HashMap<&ShardId, Option<ConfirmationRecord>> =
            shard_ids.iter().map(|id| (id, None)).collect();
        while pending.values().any(Option::is_none) {
            let event = stream
                .next()
                .await
                .ok_or(TrackerError::WatchClosed)?
                .map_err(unavailable)?;
            if event.block_height != receipt.block_height {
                continue;
            }
            if let Some(slot) = pending.get_mut(&event.shard_id) {
                let record = ConfirmationRecord::observed(&event);
                self.record(&record).await?;
                *slot = Some(record);
            }
        }
        drop(stream);

        let records = shard_ids
            .iter()
            .filter_map(|id| pending.get(id).cloned().flatten())
            .collect();
        Ok((receipt, records))
    }

    async fn owned(&self) -> Result<Vec<ShardId>, TrackerError> {
        Ok(self
            .ledger
            .list(&keys::owned_shards(&self.account))
            .await?
            .into_iter()
            .filter_map(|raw| raw.parse().ok())
            .collect())
    }

    /// Every owned shard with its cached confirmation
    pub async fn shard_status(&self) -> Result<Vec<ShardStatus>, TrackerError> {
        let mut statuses = Vec::new();
        for shard_id in self.owned().await? {
            let confirmation = self.cached(&shard_id).await?;
            statuses.push(ShardStatus {
                shard_id,
                confirmation,
            });
        }
        Ok(statuses)
    }

    /// Re-query history for every owned shard
    pub async fn sync_owned(&self) -> Result<Vec<ShardStatus>, TrackerError> {
        let mut statuses = Vec::new();
        for shard_id in self.owned().await? {
            let confirmation = self.query_history(&shard_id).await?;
            statuses.push(ShardStatus {
                shard_id,
                confirmation,
            });
        }
        tracing::debug!(shards = statuses.len(), "owned shards synced");
        Ok(statuses)
    }
}
