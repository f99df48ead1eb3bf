//! Fixtures for exercising the publisher without a node.

pub mod macros;

use std::{
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy::{
    primitives::{Address, B256, Bytes, LogData},
    rpc::{
        json_rpc::ErrorPayload,
        types::{Filter, Log},
    },
    transports::{RpcError, TransportErrorKind},
};
use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::{
    provider_pool::LogProvider,
    storage::LogStorage,
    subscriber::{LogReducer, ReducerError},
};

/// A mined log emitted by `address` with `topics`, at `(block_number, log_index)`.
#[must_use]
pub fn make_log(address: Address, topics: &[B256], block_number: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address,
            data: LogData::new_unchecked(topics.to_vec(), Bytes::new()),
        },
        block_number: Some(block_number),
        log_index: Some(log_index),
        transaction_index: Some(0),
        ..Default::default()
    }
}

/// A provider answering `eth_getLogs` from an in-memory chain of logs.
///
/// Clones share the chain, the call counter and the recorded filters, so a test can keep a clone
/// after handing one to a pool.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    chain: Arc<RwLock<Vec<Log>>>,
    calls: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
    filters: Arc<Mutex<Vec<Filter>>>,
}

impl FixtureProvider {
    #[must_use]
    pub fn new(chain: Vec<Log>) -> Self {
        Self { chain: Arc::new(RwLock::new(chain)), ..Self::default() }
    }

    /// Replace the whole chain, e.g. to simulate a reorg.
    pub fn set_chain(&self, chain: Vec<Log>) {
        *self.chain.write().unwrap_or_else(PoisonError::into_inner) = chain;
    }

    /// Make the next `count` calls fail with a server error.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Number of `eth_getLogs` calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Filters of every call received so far, in call order.
    #[must_use]
    pub fn filters(&self) -> Vec<Filter> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn matches_filter(filter: &Filter, log: &Log) -> bool {
    let Some(block) = log.block_number else { return false };
    if filter.get_from_block().is_some_and(|from| block < from) ||
        filter.get_to_block().is_some_and(|to| block > to)
    {
        return false;
    }
    if !filter.address.matches(&log.address()) {
        return false;
    }
    filter.topics.iter().enumerate().all(|(i, set)| {
        set.is_empty() || log.topics().get(i).is_some_and(|topic| set.matches(topic))
    })
}

impl LogProvider for FixtureProvider {
    fn get_logs<'a>(
        &'a self,
        filter: &'a Filter,
    ) -> BoxFuture<'a, Result<Vec<Log>, RpcError<TransportErrorKind>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().unwrap_or_else(PoisonError::into_inner).push(filter.clone());

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let result = if failing {
            Err(RpcError::ErrorResp(ErrorPayload {
                code: -32000,
                message: "header not found".into(),
                data: None,
            }))
        } else {
            let chain = self.chain.read().unwrap_or_else(PoisonError::into_inner);
            Ok(chain.iter().filter(|log| matches_filter(filter, log)).cloned().collect())
        };
        Box::pin(async move { result })
    }
}

/// Reducer appending `[block_number, log_index]` pairs to a JSON array.
///
/// Every call is also recorded in the shared journal as `"<name>:<safe|unsafe>:<log count>"`.
/// With a `delay`, the reducer sleeps before folding, which makes overlapping calls observable.
#[derive(Debug, Clone, Default)]
pub struct CollectingReducer {
    name: String,
    delay: Duration,
    journal: Arc<Mutex<Vec<String>>>,
    fail_with: Option<String>,
    fail_tentative_only: bool,
}

impl CollectingReducer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Share `journal` with other reducers to observe call order across subscribers.
    #[must_use]
    pub fn journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = journal;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every call with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Fail only the tentative folds with `message`; durable folds succeed.
    #[must_use]
    pub fn failing_tentative(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self.fail_tentative_only = true;
        self
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl LogReducer for CollectingReducer {
    fn apply<'a>(
        &'a self,
        _storage: &'a dyn LogStorage,
        prior: &'a Value,
        logs: &'a [Log],
        is_unsafe: bool,
    ) -> BoxFuture<'a, Result<Value, ReducerError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let kind = if is_unsafe { "unsafe" } else { "safe" };
            self.journal
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(format!("{}:{kind}:{}", self.name, logs.len()));
            if let Some(message) = &self.fail_with {
                if is_unsafe || !self.fail_tentative_only {
                    return Err(ReducerError::new(message));
                }
            }
            let mut collected = prior.as_array().cloned().unwrap_or_default();
            collected.extend(logs.iter().map(|log| json!([log.block_number, log.log_index])));
            Ok(Value::Array(collected))
        })
    }
}

/// Block numbers of the `[block_number, log_index]` pairs collected by a [`CollectingReducer`].
#[must_use]
pub fn collected_blocks(value: &Value) -> Vec<u64> {
    value
        .as_array()
        .map(|pairs| pairs.iter().filter_map(|pair| pair.get(0).and_then(Value::as_u64)).collect())
        .unwrap_or_default()
}
