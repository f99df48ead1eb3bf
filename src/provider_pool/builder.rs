use std::{pin::Pin, sync::Arc, time::Duration};

use crate::{
    error::ConfigError,
    provider_pool::{Error, IntoLogProvider, LogProvider, ProviderPool},
};

type BoxedProviderFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn LogProvider>, Error>> + Send>>;

/// Default timeout of a single `eth_getLogs` attempt.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
/// Default number of extra attempts after a failed call.
pub const DEFAULT_MAX_RETRIES: usize = 8;
/// Default pause before subscribing to heads on the next provider.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
/// Default time without a new head after which the head subscription is considered stale.
pub const DEFAULT_SUBSCRIPTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Builder for constructing a [`ProviderPool`].
pub struct ProviderPoolBuilder {
    providers: Vec<BoxedProviderFuture>,
    call_timeout: Duration,
    max_retries: usize,
    max_block_range: Option<u64>,
    reconnect_delay: Duration,
    subscription_timeout: Duration,
}

impl Default for ProviderPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderPoolBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            max_block_range: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            subscription_timeout: DEFAULT_SUBSCRIPTION_TIMEOUT,
        }
    }

    /// Add a provider to the pool. Any type implementing [`IntoLogProvider`] can be used.
    #[must_use]
    pub fn provider<P: IntoLogProvider + Send + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::pin(provider.into_log_provider()));
        self
    }

    /// Set the timeout of a single attempt.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the number of extra attempts after a failed call.
    #[must_use]
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Split bounded `eth_getLogs` calls into chunks of at most `max_block_range` blocks.
    ///
    /// Unset by default: providers are asked for the whole range at once.
    #[must_use]
    pub fn max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = Some(max_block_range);
        self
    }

    /// Set the pause before the head tracker subscribes through the next provider.
    #[must_use]
    pub fn reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    /// Set how long the head tracker waits for a new head before switching provider.
    ///
    /// This should be set well above the chain's block time.
    /// Default is [`DEFAULT_SUBSCRIPTION_TIMEOUT`].
    #[must_use]
    pub fn subscription_timeout(mut self, timeout: Duration) -> Self {
        self.subscription_timeout = timeout;
        self
    }

    /// Connect every provider and build the [`ProviderPool`].
    ///
    /// # Errors
    ///
    /// * [`ConfigError`] (wrapped in [`crate::PublisherError::Configuration`]) when no provider
    ///   was added or a limit is zero.
    /// * The connection error of the first provider that fails to connect.
    pub async fn build(self) -> Result<ProviderPool, crate::PublisherError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders.into());
        }
        if self.call_timeout.is_zero() {
            return Err(ConfigError::InvalidCallTimeout.into());
        }
        if self.max_block_range == Some(0) {
            return Err(ConfigError::InvalidMaxBlockRange.into());
        }

        debug!(
            call_timeout_ms = self.call_timeout.as_millis(),
            max_retries = self.max_retries,
            provider_count = self.providers.len(),
            "Building ProviderPool"
        );

        let mut providers = Vec::with_capacity(self.providers.len());
        for (idx, provider) in self.providers.into_iter().enumerate() {
            trace!(provider_index = idx, "Connecting provider");
            providers.push(provider.await?);
        }

        info!(providers = providers.len(), "ProviderPool initialized");

        Ok(ProviderPool {
            providers,
            call_timeout: self.call_timeout,
            max_retries: self.max_retries,
            max_block_range: self.max_block_range,
            reconnect_delay: self.reconnect_delay,
            subscription_timeout: self.subscription_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        network::Ethereum,
        providers::{ProviderBuilder, RootProvider, mock::Asserter},
        rpc::client::RpcClient,
    };

    use super::*;
    use crate::{ConfigError, PublisherError};

    fn mocked() -> RootProvider {
        RootProvider::<Ethereum>::new(RpcClient::mocked(Asserter::new()))
    }

    #[tokio::test]
    async fn builder_accepts_mixed_provider_types() -> anyhow::Result<()> {
        let fill_provider = ProviderBuilder::new().connect_client(RpcClient::mocked(Asserter::new()));

        let pool = ProviderPoolBuilder::new()
            .provider(mocked())
            .provider(fill_provider)
            .provider(Arc::new(mocked()) as Arc<dyn LogProvider>)
            .build()
            .await?;

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(pool.call_timeout, DEFAULT_CALL_TIMEOUT);
        Ok(())
    }

    #[tokio::test]
    async fn builder_rejects_empty_pool() {
        let err = ProviderPoolBuilder::new().build().await.unwrap_err();
        assert!(matches!(err, PublisherError::Configuration(ConfigError::NoProviders)));
    }

    #[tokio::test]
    async fn builder_rejects_zero_limits() {
        let err = ProviderPoolBuilder::new()
            .provider(mocked())
            .call_timeout(Duration::ZERO)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, PublisherError::Configuration(ConfigError::InvalidCallTimeout)));

        let err =
            ProviderPoolBuilder::new().provider(mocked()).max_block_range(0).build().await.unwrap_err();
        assert!(matches!(err, PublisherError::Configuration(ConfigError::InvalidMaxBlockRange)));
    }
}
