/**
 * Settings shared by every component:
 *  account namespace, wordlist, KDF cost
 *  and the default password.
 */
pub mod config;
/**
 * Storage confirmation tracking.
 *  Waits for custodians to attest possession
 *  of a shard and caches the latest attestation.
 */
pub mod confirmation;
/**
 * Cryptographic types and operations.
 *  - Mnemonic codec for arbitrary length shares
 *  - Threshold secret sharing
 *  - Password and custody key encryption
 *  - Splitting and recombining a secret
 */
pub mod crypto;
/**
 * Append-only ledger of storage confirmations,
 *  in memory or as a JSON-lines journal.
 */
pub mod event_log;
/**
 * Durable key-value bookkeeping for shards,
 *  namespaced by account.
 */
pub mod ledger;
/**
 * Shard lifecycle: content ids, local
 *  encrypted copies and remote custody.
 */
pub mod shard;

pub mod prelude {
    pub use crate::config::KeySplitConfig;
    pub use crate::confirmation::{ConfirmationRecord, ConfirmationTracker, TrackerError};
    pub use crate::crypto::{KeySplitError, KeySplitter, Mnemonic, MnemonicCodec, Password};
    pub use crate::event_log::{EventLedger, JournalEventLedger, MemoryEventLedger};
    pub use crate::ledger::{FileLedger, Ledger, LocalLedgerProvider, MemoryLedger};
    pub use crate::shard::{
        CustodyError, RemoteShardStore, RetrievalCapability, ShardCustodyStore, ShardId,
        ShardRecord,
    };
}
