//! The processing engine.
//!
//! A [`ChainPublisher`] owns the subscriber registry, the chain [`HeadCursor`] and the in-memory
//! overlay of tentative state. Its loop turns every new head into one processing cycle:
//!
//! 1. every subscriber's elementary requests are derived from its persisted state,
//! 2. requests are partitioned by shape and each partition is merged into one `eth_getLogs`,
//! 3. partitions are fetched concurrently and merged into a single sorted stream,
//! 4. subscribers are served group by group (ascending `order`), each receiving only the logs
//!    matching its own clauses, split at its safe block into durable and tentative logs.
//!
//! A failed cycle is logged and retried for the same head after a short delay. Nothing a cycle
//! does is fatal to the loop.

mod builder;
mod cycle;
mod head;
mod registry;
mod state;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::Duration,
};

use alloy::primitives::BlockNumber;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::{task::JoinHandle, time::sleep};

use crate::{
    PublisherError,
    provider_pool::{ProviderPool, heads::track_heads},
    storage::LogStorage,
    subscriber::SubscriberSpec,
};

pub use builder::{
    ChainPublisherBuilder, DEFAULT_ERROR_DELAY, DEFAULT_IDLE_DELAY, DEFAULT_RANGE_THRESHOLD,
    DEFAULT_STALLED_DELAY,
};
use head::wait_for_head_change;
pub use head::HeadCursor;
use registry::Registry;

#[derive(Debug, Clone)]
pub(crate) struct PublisherConfig {
    pub(crate) range_threshold: u64,
    pub(crate) idle_delay: Duration,
    pub(crate) stalled_delay: Duration,
    pub(crate) error_delay: Duration,
    pub(crate) sticky_unsafe_provider: bool,
    pub(crate) track_heads: bool,
}

/// What [`ChainPublisher::get_state`] reports for a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberView {
    /// Durable state, folded from logs at or below the safe block.
    pub changes: Value,
    /// The tentative logs of the last cycle (those above the safe block) folded from the
    /// subscriber's initial changes. Callers combine it with `changes`. `None` until the
    /// subscriber has been served once by this process.
    pub unsafe_changes: Option<Value>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) pool: ProviderPool,
    pub(crate) storage: Arc<dyn LogStorage>,
    pub(crate) registry: Registry,
    pub(crate) overlay: RwLock<HashMap<String, Value>>,
    pub(crate) head: HeadCursor,
    pub(crate) last_processed: Mutex<Option<BlockNumber>>,
    pub(crate) config: PublisherConfig,
}

/// Incremental log indexer serving many subscribers from shared `eth_getLogs` calls.
///
/// Cloning is cheap; clones drive the same registry, head and overlay.
///
/// # Example
///
/// ```rust,no_run
/// use alloy::primitives::{address, b256};
/// use chain_publisher::{
///     ChainPublisherBuilder,
///     provider_pool::ProviderPoolBuilder,
///     storage::JsonFileStorage,
///     subscriber::{FilterClause, SubscriberSpec, reducer_fn},
/// };
/// use serde_json::json;
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = ProviderPoolBuilder::new().provider("ws://localhost:8545").build().await?;
/// let publisher = ChainPublisherBuilder::new()
///     .provider_pool(pool)
///     .storage(JsonFileStorage::open("./state").await?)
///     .build()?;
///
/// let transfer = b256!("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
/// publisher.subscribe(
///     SubscriberSpec::new("usdt-transfers")
///         .filter(
///             FilterClause::new()
///                 .address(address!("0x55d398326f99059ff775485246999027b3197955"))
///                 .event(transfer),
///         )
///         .genesis(30_000_000)
///         .safe_depth(12)
///         .reducer(reducer_fn(|prior, logs, _is_unsafe| {
///             Ok(json!(prior.as_u64().unwrap_or_default() + logs.len() as u64))
///         })),
/// )?;
///
/// let _handle = publisher.start();
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct ChainPublisher {
    pub(crate) inner: Arc<Inner>,
}

impl ChainPublisher {
    pub(crate) fn new(
        pool: ProviderPool,
        storage: Arc<dyn LogStorage>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                storage,
                registry: Registry::default(),
                overlay: RwLock::new(HashMap::new()),
                head: HeadCursor::default(),
                last_processed: Mutex::new(None),
                config,
            }),
        }
    }

    #[must_use]
    pub fn builder() -> ChainPublisherBuilder {
        ChainPublisherBuilder::new()
    }

    /// Register a subscriber, replacing any subscriber with the same key.
    ///
    /// # Errors
    ///
    /// [`PublisherError::Configuration`] when the spec is incomplete; nothing is registered then.
    pub fn subscribe(&self, spec: SubscriberSpec) -> Result<(), PublisherError> {
        let subscriber = spec.validate()?;
        let key = subscriber.key.clone();
        if self.inner.registry.insert(subscriber) {
            info!(key = %key, "Replaced subscriber");
        } else {
            info!(key = %key, "Registered subscriber");
        }
        Ok(())
    }

    /// Remove a subscriber and its tentative state. Does nothing for an unknown key.
    pub fn unsubscribe(&self, key: &str) {
        if self.inner.registry.remove(key) {
            self.inner.overlay.write().unwrap_or_else(PoisonError::into_inner).remove(key);
            info!(key = key, "Removed subscriber");
        }
    }

    #[must_use]
    pub fn is_subscribed(&self, key: &str) -> bool {
        self.inner.registry.contains(key)
    }

    /// Durable and tentative state of `key`.
    ///
    /// Unknown keys report empty durable changes and no tentative state.
    ///
    /// # Errors
    ///
    /// [`PublisherError::Storage`] when the backend cannot be read.
    pub async fn get_state(&self, key: &str) -> Result<SubscriberView, PublisherError> {
        let durable = self
            .inner
            .storage
            .get(key)
            .await
            .map_err(|source| PublisherError::Storage { key: key.to_owned(), source })?;
        let unsafe_changes =
            self.inner.overlay.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned();
        Ok(SubscriberView {
            changes: durable.map_or_else(|| Value::Object(Map::new()), |state| state.changes),
            unsafe_changes,
        })
    }

    /// The head cursor. Advance it manually when head tracking is disabled.
    #[must_use]
    pub fn head(&self) -> &HeadCursor {
        &self.inner.head
    }

    /// Head processed by the last successful cycle.
    #[must_use]
    pub fn last_processed(&self) -> Option<BlockNumber> {
        *self.inner.last_processed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the processing loop, and the head tracker unless disabled, on the current tokio
    /// runtime.
    ///
    /// Dropping the returned handle leaves both running.
    #[must_use]
    pub fn start(&self) -> PublisherHandle {
        let head_task = self
            .inner
            .config
            .track_heads
            .then(|| tokio::spawn(track_heads(self.inner.pool.clone(), self.inner.head.clone())));
        let loop_task = tokio::spawn(self.clone().run());
        info!(track_heads = head_task.is_some(), "Publisher started");
        PublisherHandle { loop_task, head_task }
    }

    /// Run the processing loop on the current task. Never returns.
    pub async fn run(self) {
        let config = self.inner.config.clone();
        let mut heads = self.inner.head.subscribe();
        loop {
            let head = *heads.borrow_and_update();
            let Some(head) = head.filter(|_| !self.inner.registry.is_empty()) else {
                debug!("Waiting for subscribers and a chain head");
                sleep(config.idle_delay).await;
                continue;
            };

            if self.last_processed() == Some(head) {
                trace!(head = head, "Head unchanged since last cycle");
                wait_for_head_change(&mut heads, config.stalled_delay).await;
                continue;
            }

            match self.process_head(head).await {
                Ok(processed) => {
                    *self.inner.last_processed.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(processed);
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(head = head, error = %e, "Processing cycle failed, retrying");
                    } else {
                        error!(head = head, error = %e, "Unexpected processing error, retrying");
                    }
                    sleep(config.error_delay).await;
                }
            }
        }
    }
}

/// Tasks spawned by [`ChainPublisher::start`].
#[derive(Debug)]
pub struct PublisherHandle {
    loop_task: JoinHandle<()>,
    head_task: Option<JoinHandle<()>>,
}

impl PublisherHandle {
    /// Stop the processing loop and the head tracker.
    pub fn abort(&self) {
        self.loop_task.abort();
        if let Some(head_task) = &self.head_task {
            head_task.abort();
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.loop_task.is_finished()
    }
}
