use std::fmt::Display;

use alloy::rpc::types::Log;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::storage::LogStorage;

/// Failure reported by a [`LogReducer`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ReducerError {
    pub message: String,
}

impl ReducerError {
    #[must_use]
    pub fn new(message: impl Display) -> Self {
        Self { message: message.to_string() }
    }
}

/// Folds logs into a subscriber's derived state.
///
/// `apply` receives the prior value and the logs of one cycle (sorted, duplicate-free) and
/// returns the new value. It is called twice per cycle: once with the reorg-safe logs
/// (`is_unsafe == false`), whose result is persisted, and once with the tentative logs on top of
/// that result (`is_unsafe == true`), whose result only lives in memory. The tentative call is
/// repeated every cycle over a recomputed window, so it should not have side effects.
pub trait LogReducer: Send + Sync {
    fn apply<'a>(
        &'a self,
        storage: &'a dyn LogStorage,
        prior: &'a Value,
        logs: &'a [Log],
        is_unsafe: bool,
    ) -> BoxFuture<'a, Result<Value, ReducerError>>;
}

/// A [`LogReducer`] backed by a synchronous closure.
pub struct FnReducer<F>(F);

impl<F> LogReducer for FnReducer<F>
where
    F: Fn(&Value, &[Log], bool) -> Result<Value, ReducerError> + Send + Sync,
{
    fn apply<'a>(
        &'a self,
        _storage: &'a dyn LogStorage,
        prior: &'a Value,
        logs: &'a [Log],
        is_unsafe: bool,
    ) -> BoxFuture<'a, Result<Value, ReducerError>> {
        let result = (self.0)(prior, logs, is_unsafe);
        Box::pin(async move { result })
    }
}

/// Wrap a closure `(prior, logs, is_unsafe) -> new value` as a [`LogReducer`].
///
/// ```rust
/// use chain_publisher::subscriber::reducer_fn;
/// use serde_json::json;
///
/// let count_logs = reducer_fn(|prior, logs, _is_unsafe| {
///     Ok(json!(prior.as_u64().unwrap_or_default() + logs.len() as u64))
/// });
/// # let _ = count_logs;
/// ```
pub fn reducer_fn<F>(f: F) -> FnReducer<F>
where
    F: Fn(&Value, &[Log], bool) -> Result<Value, ReducerError> + Send + Sync,
{
    FnReducer(f)
}
