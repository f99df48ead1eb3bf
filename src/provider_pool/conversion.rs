use std::sync::Arc;

use alloy::{
    network::{Ethereum, Network},
    providers::{
        DynProvider, Provider, RootProvider,
        fillers::{FillProvider, TxFiller},
    },
    transports::http::reqwest::Url,
};

use crate::provider_pool::{Error, LogProvider};

/// Conversion trait for types that can join a [`ProviderPool`](crate::provider_pool::ProviderPool).
///
/// Connection strings are connected on [`ProviderPoolBuilder::build`], with the transport
/// (HTTP, WebSocket or IPC) inferred from the URL scheme.
///
/// [`ProviderPoolBuilder::build`]: crate::provider_pool::ProviderPoolBuilder::build
pub trait IntoLogProvider {
    /// Convert `self` into a shared [`LogProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying provider cannot be constructed or connected.
    fn into_log_provider(self) -> impl Future<Output = Result<Arc<dyn LogProvider>, Error>> + Send;
}

impl<P: LogProvider + 'static> IntoLogProvider for P {
    async fn into_log_provider(self) -> Result<Arc<dyn LogProvider>, Error> {
        Ok(Arc::new(self))
    }
}

impl IntoLogProvider for Arc<dyn LogProvider> {
    async fn into_log_provider(self) -> Result<Arc<dyn LogProvider>, Error> {
        Ok(self)
    }
}

impl IntoLogProvider for &str {
    async fn into_log_provider(self) -> Result<Arc<dyn LogProvider>, Error> {
        let provider = RootProvider::<Ethereum>::connect(self).await?;
        Ok(Arc::new(provider))
    }
}

impl IntoLogProvider for Url {
    async fn into_log_provider(self) -> Result<Arc<dyn LogProvider>, Error> {
        let provider = RootProvider::<Ethereum>::connect(self.as_str()).await?;
        Ok(Arc::new(provider))
    }
}

impl<F, P, N> IntoLogProvider for FillProvider<F, P, N>
where
    F: TxFiller<N>,
    P: Provider<N>,
    N: Network,
{
    async fn into_log_provider(self) -> Result<Arc<dyn LogProvider>, Error> {
        Ok(Arc::new(self.root().to_owned()))
    }
}

impl<N: Network> IntoLogProvider for DynProvider<N> {
    async fn into_log_provider(self) -> Result<Arc<dyn LogProvider>, Error> {
        Ok(Arc::new(self.root().to_owned()))
    }
}
