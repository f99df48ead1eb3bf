use std::{sync::Arc, time::Duration};

use crate::{
    PublisherError,
    error::ConfigError,
    provider_pool::ProviderPool,
    publisher::{ChainPublisher, PublisherConfig},
    storage::LogStorage,
};

/// Default head distance above which a cycle bounds its fetch range at the head.
pub const DEFAULT_RANGE_THRESHOLD: u64 = 1000;
/// Default pause while there are no subscribers or no known head.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(3);
/// Default pause while the head has not moved since the last cycle.
pub const DEFAULT_STALLED_DELAY: Duration = Duration::from_secs(3);
/// Default pause after a failed cycle.
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(1);

/// Builder for a [`ChainPublisher`].
#[derive(Debug)]
pub struct ChainPublisherBuilder {
    pool: Option<ProviderPool>,
    storage: Option<Arc<dyn LogStorage>>,
    config: PublisherConfig,
}

impl Default for ChainPublisherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainPublisherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: None,
            storage: None,
            config: PublisherConfig {
                range_threshold: DEFAULT_RANGE_THRESHOLD,
                idle_delay: DEFAULT_IDLE_DELAY,
                stalled_delay: DEFAULT_STALLED_DELAY,
                error_delay: DEFAULT_ERROR_DELAY,
                sticky_unsafe_provider: true,
                track_heads: true,
            },
        }
    }

    /// Providers used for `eth_getLogs` and head notifications.
    #[must_use]
    pub fn provider_pool(mut self, pool: ProviderPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Durable backend for subscriber state.
    #[must_use]
    pub fn storage(mut self, storage: impl LogStorage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// When the head is more than `range_threshold` blocks past the lowest resume block, the
    /// fetch range is bounded at the head; otherwise it is left open.
    ///
    /// Default is [`DEFAULT_RANGE_THRESHOLD`].
    #[must_use]
    pub fn range_threshold(mut self, range_threshold: u64) -> Self {
        self.config.range_threshold = range_threshold;
        self
    }

    #[must_use]
    pub fn idle_delay(mut self, delay: Duration) -> Self {
        self.config.idle_delay = delay;
        self
    }

    #[must_use]
    pub fn stalled_delay(mut self, delay: Duration) -> Self {
        self.config.stalled_delay = delay;
        self
    }

    #[must_use]
    pub fn error_delay(mut self, delay: Duration) -> Self {
        self.config.error_delay = delay;
        self
    }

    /// Serve every fetch of an open-ended cycle from one provider, so the tentative window is
    /// read from a single view of the chain tip. Enabled by default.
    #[must_use]
    pub fn sticky_unsafe_provider(mut self, sticky: bool) -> Self {
        self.config.sticky_unsafe_provider = sticky;
        self
    }

    /// Whether [`ChainPublisher::start`] also subscribes to new heads through the pool.
    ///
    /// Disable it to drive the head yourself with [`HeadCursor::advance`](crate::HeadCursor).
    /// Enabled by default.
    #[must_use]
    pub fn track_heads(mut self, track_heads: bool) -> Self {
        self.config.track_heads = track_heads;
        self
    }

    /// Build the publisher.
    ///
    /// # Errors
    ///
    /// [`PublisherError::Configuration`] when the storage or the provider pool is missing.
    pub fn build(self) -> Result<ChainPublisher, PublisherError> {
        let storage = self.storage.ok_or(ConfigError::MissingStorage)?;
        let pool = self.pool.filter(|p| !p.is_empty()).ok_or(ConfigError::NoProviders)?;
        Ok(ChainPublisher::new(pool, storage, self.config))
    }
}
