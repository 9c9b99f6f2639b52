//! Shard custody
//!
//! A shard is one share of a split secret, in its canonical padded form.
//! Shards are kept locally under the owner's password and/or handed to a
//! remote custodian under a random key; either way they are addressed by a
//! [`ShardId`] derived from their content alone.

mod custody;
mod id;
mod remote;

pub use custody::{CustodyError, ShardCustodyStore, ShardRecord};
pub use id::{InvalidShardId, ShardId};
pub use remote::{InvalidCapability, RemoteShardStore, RetrievalCapability};
