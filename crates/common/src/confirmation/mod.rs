//! Storage confirmation tracking
//!
//! Custodians attest possession of a shard on the event ledger. The tracker
//! waits for those attestations, single shot and cancellable, and keeps the
//! most advanced one per shard in the local ledger.

mod tracker;

pub use tracker::{ConfirmationRecord, ConfirmationTracker, ShardStatus, TrackerError};
