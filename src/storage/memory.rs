use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use futures::future::BoxFuture;

use crate::storage::{LogStorage, StorageError, SubscriberState};

/// Process-local storage. State is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    states: RwLock<HashMap<String, SubscriberState>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.states.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }
}

impl LogStorage for MemoryStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SubscriberState>, StorageError>> {
        let state = self.states.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned();
        Box::pin(async move { Ok(state) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        state: SubscriberState,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        self.states.write().unwrap_or_else(PoisonError::into_inner).insert(key.to_owned(), state);
        Box::pin(async { Ok(()) })
    }
}
