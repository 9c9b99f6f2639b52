//! Shared test utilities for keysplit integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use common::config::KeySplitConfig;
use common::confirmation::ConfirmationTracker;
use common::crypto::{KdfParams, KeySplitter};
use common::event_log::{
    ConfirmStorage, EventFilter, EventLedger, EventStream, MemoryEventLedger, StorageConfirmed,
    TxReceipt,
};
use common::ledger::{FileLedger, Ledger};
use common::shard::{ShardCustodyStore, ShardId};
use object_store::ObjectStore;
use parking_lot::Mutex;
use tempfile::TempDir;

pub const ACCOUNT: &str = "alice";

/// Config with a KDF cheap enough for tests
pub fn test_config() -> KeySplitConfig {
    KeySplitConfig::new(ACCOUNT).with_kdf(KdfParams::with_iterations(1_000))
}

pub struct TestEnv {
    pub config: KeySplitConfig,
    pub splitter: KeySplitter,
    pub custody: ShardCustodyStore<FileLedger, ObjectStore>,
    pub tracker: ConfirmationTracker<MemoryEventLedger, FileLedger>,
    pub events: MemoryEventLedger,
    pub temp_dir: TempDir,
}

/// Set up a splitter, an on-disk custody store and a tracker sharing one ledger file
pub async fn setup_test_env() -> TestEnv {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config();

    let ledger = Ledger::new(
        FileLedger::open(temp_dir.path().join("ledger.json"))
            .await
            .unwrap(),
    );
    let remote = ObjectStore::new_local(&temp_dir.path().join("objects"))
        .await
        .unwrap();
    let events = MemoryEventLedger::new();

    TestEnv {
        splitter: KeySplitter::new(&config),
        custody: ShardCustodyStore::new(&config, ledger.clone(), remote),
        tracker: ConfirmationTracker::new(&config, ledger, events.clone()),
        events,
        config,
        temp_dir,
    }
}

pub fn event(shard_id: &ShardId, block_height: u64, party: &str) -> StorageConfirmed {
    StorageConfirmed {
        shard_id: shard_id.clone(),
        attesting_party: party.to_string(),
        block_height,
    }
}

/// Event ledger whose `query` answers from a script, one batch per call,
///  regardless of the requested starting height
#[derive(Debug, Clone, Default)]
pub struct ScriptedEventLedger {
    batches: Arc<Mutex<VecDeque<Vec<StorageConfirmed>>>>,
    queries: Arc<Mutex<Vec<EventFilter>>>,
}

impl ScriptedEventLedger {
    pub fn new(batches: Vec<Vec<StorageConfirmed>>) -> Self {
        Self {
            batches: Arc::new(Mutex::new(batches.into())),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Filters passed to `query` so far
    pub fn queries(&self) -> Vec<EventFilter> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl EventLedger for ScriptedEventLedger {
    type Error = String;

    async fn submit(&self, _tx: ConfirmStorage) -> Result<TxReceipt, Self::Error> {
        Err("scripted ledger is read only".to_string())
    }

    async fn watch(&self, _filter: EventFilter) -> Result<EventStream<Self::Error>, Self::Error> {
        Err("scripted ledger cannot be watched".to_string())
    }

    async fn query(&self, filter: EventFilter) -> Result<Vec<StorageConfirmed>, Self::Error> {
        self.queries.lock().push(filter.clone());
        let batch = self.batches.lock().pop_front().unwrap_or_default();
        Ok(batch.into_iter().filter(|e| filter.matches(e)).collect())
    }

    async fn head(&self) -> Result<u64, Self::Error> {
        Ok(0)
    }
}
