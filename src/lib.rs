//! Chain-Publisher incrementally indexes EVM event logs for many independent subscribers.
//!
//! The main entry point is [`ChainPublisher`], built via [`ChainPublisherBuilder`] from a
//! [`provider_pool::ProviderPool`] and a [`storage::LogStorage`] backend.
//!
//! Register subscribers with [`ChainPublisher::subscribe`], then call [`ChainPublisher::start`]
//! to follow the chain head.
//!
//! # Subscribers
//!
//! A subscriber is a key, one or more filter clauses, a genesis block, a safe depth and a
//! [`subscriber::LogReducer`] that folds logs into an opaque JSON value. The publisher never
//! stores raw logs, only what reducers return.
//!
//! # Shared fetching
//!
//! Every cycle derives one request per subscriber clause, groups the requests by shape (which of
//! address and topic positions they constrain) and issues a single `eth_getLogs` per group with a
//! filter that over-approximates all of them. Results are merged into one sorted stream and then
//! filtered back down per subscriber, so many subscribers with similar filters cost one call.
//!
//! # Reorgs and finality
//!
//! Logs more than `safe_depth` blocks behind the head are folded durably and persisted together
//! with the block they cover, the subscriber's *safe block*. The remaining tentative logs are
//! folded separately, from the subscriber's initial changes, into an in-memory overlay that is
//! recomputed from scratch every cycle, so a reorg inside the tentative window never reaches
//! durable state. [`ChainPublisher::get_state`] returns both parts for the caller to combine.
//!
//! # Ordering
//!
//! Subscribers are served in groups of ascending [`order`](subscriber::SubscriberSpec::order).
//! Inside a group they run concurrently; a group starts only once the previous one committed.
//!
//! # Provider pool
//!
//! The [`provider_pool`] module retries `eth_getLogs` with a jittered backoff across a pool of
//! interchangeable endpoints and follows new heads over pubsub-capable ones.

#[macro_use]
mod logging;

pub mod log_filter;
pub mod provider_pool;
pub mod storage;
pub mod subscriber;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;
mod publisher;

pub use error::{ConfigError, PublisherError};
pub use publisher::{
    ChainPublisher, ChainPublisherBuilder, DEFAULT_ERROR_DELAY, DEFAULT_IDLE_DELAY,
    DEFAULT_RANGE_THRESHOLD, DEFAULT_STALLED_DELAY, HeadCursor, PublisherHandle, SubscriberView,
};
