//! Event ledger: the append-only record of custodian storage confirmations
//!
//! Custodians attest that they hold a shard by submitting a [`ConfirmStorage`]
//! transaction; the ledger turns it into one [`StorageConfirmed`] event per
//! shard, all at the same block height. Two implementations ship here:
//!
//! - [`MemoryEventLedger`] keeps blocks in process and pushes events to
//!   watchers over a broadcast channel
//! - [`JournalEventLedger`] appends blocks to a JSON-lines file and lets
//!   watchers poll it, so several processes can share one ledger

mod journal;
mod memory;
mod provider;

pub use journal::{JournalError, JournalEventLedger, DEFAULT_POLL_INTERVAL};
pub use memory::{MemoryEventLedger, MemoryEventLedgerError};
pub use provider::{
    ConfirmStorage, EventFilter, EventLedger, EventStream, FromHeight, StorageConfirmed, TxReceipt,
};
