//! Retrying `eth_getLogs` over a pool of interchangeable providers.
//!
//! This module exposes [`ProviderPool`], a set of [`LogProvider`]s that all serve the same chain.
//! Every call made through the pool:
//! * picks a provider at random per attempt, or deterministically from a caller-supplied seed
//! * is bounded by a per-attempt timeout
//! * is retried with a jittered, linearly growing backoff up to `max_retries` extra attempts
//! * is optionally split into block-range chunks when the node limits `eth_getLogs` ranges
//!
//! Use [`ProviderPoolBuilder`] to construct a pool with sensible defaults, or implement
//! [`IntoLogProvider`] to accept custom provider types.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use alloy::rpc::types::Filter;
//! use chain_publisher::provider_pool::ProviderPoolBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = ProviderPoolBuilder::new()
//!     .provider("ws://localhost:8545")
//!     .provider("http://localhost:8546")
//!     .call_timeout(Duration::from_secs(30))
//!     .build()
//!     .await?;
//!
//! let logs = pool.get_logs(&Filter::new().from_block(0u64).to_block(100u64), None).await?;
//! println!("fetched {} logs", logs.len());
//! # Ok(()) }
//! ```

mod backoff;
mod builder;
mod conversion;
pub(crate) mod heads;
mod pool;
mod provider;

use std::sync::Arc;

use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

pub use backoff::{JitterBackoff, JitterBuilder, backoff_delay};
pub use builder::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RECONNECT_DELAY,
    DEFAULT_SUBSCRIPTION_TIMEOUT, ProviderPoolBuilder,
};
pub use conversion::IntoLogProvider;
pub use pool::ProviderPool;
pub use provider::LogProvider;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Operation timed out")]
    Timeout,
    #[error("RPC call failed after exhausting all retry attempts: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),
    #[error("Unexpected logs response: {0}")]
    Protocol(String),
}

impl Error {
    /// Whether another attempt could succeed. A malformed response is a contract violation of
    /// the provider and is never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Protocol(_))
    }
}

impl From<RpcError<TransportErrorKind>> for Error {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match err {
            RpcError::DeserError { text, .. } => Error::Protocol(text),
            RpcError::NullResp => Error::Protocol("null".to_owned()),
            err => Error::RpcError(Arc::new(err)),
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}
