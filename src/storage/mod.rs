//! Durable per-subscriber state.
//!
//! The publisher persists one [`SubscriberState`] record per subscriber key through a
//! [`LogStorage`] backend. The record carries both the folded `changes` and the `safe_block` they
//! cover, so a single `set` moves them together.

mod file;
mod memory;

use std::{fmt::Debug, sync::Arc};

use alloy::primitives::BlockNumber;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

/// The durable state of one subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberState {
    /// Highest block whose logs are folded into `changes`. `None` before the first block.
    pub safe_block: Option<BlockNumber>,
    /// Reducer output. Opaque to the publisher.
    pub changes: Value,
}

impl SubscriberState {
    /// The state of a subscriber that has not processed anything since `genesis`.
    #[must_use]
    pub fn initial(genesis: BlockNumber) -> Self {
        Self { safe_block: genesis.checked_sub(1), changes: Value::Object(Map::new()) }
    }
}

impl Default for SubscriberState {
    fn default() -> Self {
        Self::initial(0)
    }
}

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),
    #[error("Malformed state record: {0}")]
    Serde(Arc<serde_json::Error>),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Io(Arc::new(error))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serde(Arc::new(error))
    }
}

/// Key-value store for [`SubscriberState`] records, keyed by subscriber key.
///
/// Reducers receive the same storage, so a subscriber can read the state another subscriber of
/// an earlier `order` group committed in the same cycle.
pub trait LogStorage: Send + Sync + Debug {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SubscriberState>, StorageError>>;

    /// Replace the record stored under `key`. Must be atomic per key: readers observe either
    /// the previous record or `state`, never a mix.
    fn set<'a>(
        &'a self,
        key: &'a str,
        state: SubscriberState,
    ) -> BoxFuture<'a, Result<(), StorageError>>;
}

impl<S: LogStorage + ?Sized> LogStorage for Arc<S> {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SubscriberState>, StorageError>> {
        (**self).get(key)
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        state: SubscriberState,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        (**self).set(key, state)
    }
}
