//! Remote custody storage for encrypted shards
//!
//! This crate is the "object store" half of shard custody: it takes an opaque,
//! already-encrypted blob and hands back a [`Locator`] that can later be used
//! to fetch the same bytes again. It never sees plaintext or keys.
//!
//! # Backends
//!
//! - In-memory (tests and embedding)
//! - Local filesystem
//! - S3-compatible storage (AWS S3, MinIO, ...)
//! - The HTTP custody endpoint (`POST {shardid, data}` / `GET ?id=<locator>`)
//!
//! The first three are backed by the `object_store` crate and address blobs by
//! the BLAKE3 hash of the stored bytes, so the locator is content-derived and
//! independent of any shard identifier.
//!
//! # Example
//!
//! ```rust,no_run
//! use keysplit_object_store::ObjectStore;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), keysplit_object_store::ObjectStoreError> {
//! let store = ObjectStore::new_local(Path::new("/tmp/shards")).await?;
//! let locator = store.put("3f2a...", b"ciphertext".to_vec().into()).await?;
//! let blob = store.get(&locator).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod http;
mod storage;
mod store;

pub use error::{ObjectStoreError, Result};
pub use storage::ObjectStoreConfig;
pub use store::{Locator, ObjectStore};
