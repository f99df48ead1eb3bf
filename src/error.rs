use std::sync::Arc;

use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

use crate::{
    provider_pool::Error as ProviderPoolError, storage::StorageError, subscriber::ReducerError,
};

/// Errors emitted by the publisher.
///
/// Registration and builder failures are returned as [`PublisherError::Configuration`] and are
/// never retried. Everything else surfaces from a processing cycle; the processing loop logs the
/// error, backs off briefly and retries the same head, so none of them is fatal to the process.
#[derive(Error, Debug, Clone)]
pub enum PublisherError {
    /// A subscriber spec or the engine configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// The underlying RPC transport returned an error after all retries.
    #[error("RPC error: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),

    /// Every attempt of an RPC call exceeded the call timeout.
    #[error("Operation timed out")]
    Timeout,

    /// A provider answered `eth_getLogs` with something that is not a log sequence.
    #[error("Unexpected logs response: {0}")]
    Protocol(String),

    /// A subscriber's reducer rejected the logs it was handed.
    #[error("Subscriber {key} failed to apply logs: {source}")]
    Application {
        key: String,
        #[source]
        source: ReducerError,
    },

    /// The storage backend failed to read or write a subscriber's state.
    #[error("Storage failure for {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl PublisherError {
    /// Whether the error is a known, transient RPC condition (timeouts, transport failures,
    /// server-side errors). The processing loop logs these as warnings instead of unexpected
    /// errors.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            PublisherError::Timeout => true,
            PublisherError::RpcError(err) => is_transient_rpc_error(err),
            _ => false,
        }
    }
}

/// Classifies transport-level failures and JSON-RPC server errors as transient.
pub(crate) fn is_transient_rpc_error(error: &RpcError<TransportErrorKind>) -> bool {
    match error {
        RpcError::Transport(_) => true,
        RpcError::ErrorResp(payload) => {
            (-32099..=-32000).contains(&payload.code) || payload.code == 429
        }
        _ => false,
    }
}

impl From<ProviderPoolError> for PublisherError {
    fn from(error: ProviderPoolError) -> PublisherError {
        match error {
            ProviderPoolError::Timeout => PublisherError::Timeout,
            ProviderPoolError::RpcError(err) => PublisherError::RpcError(err),
            ProviderPoolError::Protocol(text) => PublisherError::Protocol(text),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for PublisherError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        ProviderPoolError::from(error).into()
    }
}

/// Reasons a subscriber spec or the engine configuration is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing subscriber key")]
    MissingKey,

    #[error("Subscriber {0} has no filter clause")]
    MissingFilter(String),

    #[error("Subscriber {key} filter clause {clause} has {count} topic positions, at most 4 allowed")]
    TooManyTopics { key: String, clause: usize, count: usize },

    #[error("Subscriber {0} is missing safe depth")]
    MissingSafeDepth(String),

    #[error("Subscriber {0} has no reducer")]
    MissingReducer(String),

    #[error("Storage must be configured")]
    MissingStorage,

    #[error("At least one provider must be configured")]
    NoProviders,

    #[error("Call timeout must be greater than 0")]
    InvalidCallTimeout,

    #[error("Max block range must be greater than 0")]
    InvalidMaxBlockRange,
}
