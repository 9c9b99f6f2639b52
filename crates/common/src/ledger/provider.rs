use std::fmt::{Debug, Display};

use async_trait::async_trait;

/// String keyed persistent storage with localStorage semantics
///
/// Values are opaque strings; typed JSON access and per-key write
///  serialisation are layered on top by [`super::Ledger`]. Implementations
///  only need last-writer-wins per key, unless they are shared between
///  processes, in which case they override [`Self::update`].
#[async_trait]
pub trait LocalLedgerProvider: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send + Sync + 'static;

    /// Read the value stored under `key`
    ///
    /// # Returns
    /// * `Ok(None)` - Nothing is stored under the key
    /// * `Ok(Some(value))` - The last value written
    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error>;

    /// Remove `key`, returning whether it was present
    async fn remove(&self, key: &str) -> Result<bool, Self::Error>;

    /// Replace the value under `key` with `f(current)`, leaving it untouched
    ///  when `f` returns `None`. Returns whether a write happened.
    ///
    /// The default is a plain get then set; the read-modify-write is atomic
    ///  only within one [`super::Ledger`].
    async fn update(
        &self,
        key: &str,
        f: &mut (dyn FnMut(Option<String>) -> Option<String> + Send),
    ) -> Result<bool, Self::Error> {
        let current = self.get(key).await?;
        match f(current) {
            Some(next) => {
                self.set(key, next).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
