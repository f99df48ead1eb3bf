use std::fmt::Debug;

use alloy::{
    consensus::BlockHeader,
    network::Network,
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
    transports::{RpcError, TransportErrorKind},
};
use futures::{StreamExt, future::BoxFuture, stream::BoxStream};

/// A single RPC endpoint able to serve `eth_getLogs` and, optionally, new-head notifications.
///
/// Implemented for Alloy's [`RootProvider`]; custom transports and test fixtures implement it
/// directly.
pub trait LogProvider: Send + Sync + Debug {
    /// Fetch the logs matching `filter` in one `eth_getLogs` call.
    fn get_logs<'a>(
        &'a self,
        filter: &'a Filter,
    ) -> BoxFuture<'a, Result<Vec<Log>, RpcError<TransportErrorKind>>>;

    /// Subscribe to new chain heads, yielding block numbers.
    ///
    /// Providers without a pubsub transport keep the default, which fails with
    /// [`TransportErrorKind::PubsubUnavailable`].
    fn subscribe_heads(
        &self,
    ) -> BoxFuture<'_, Result<BoxStream<'static, u64>, RpcError<TransportErrorKind>>> {
        Box::pin(async { Err(RpcError::Transport(TransportErrorKind::PubsubUnavailable)) })
    }

    /// Whether [`subscribe_heads`](LogProvider::subscribe_heads) can succeed at all.
    fn supports_pubsub(&self) -> bool {
        false
    }
}

impl<N: Network> LogProvider for RootProvider<N> {
    fn get_logs<'a>(
        &'a self,
        filter: &'a Filter,
    ) -> BoxFuture<'a, Result<Vec<Log>, RpcError<TransportErrorKind>>> {
        Box::pin(Provider::get_logs(self, filter))
    }

    fn subscribe_heads(
        &self,
    ) -> BoxFuture<'_, Result<BoxStream<'static, u64>, RpcError<TransportErrorKind>>> {
        Box::pin(async move {
            let subscription = Provider::subscribe_blocks(self).await?;
            Ok(subscription.into_stream().map(|header| header.number()).boxed())
        })
    }

    fn supports_pubsub(&self) -> bool {
        self.client().pubsub_frontend().is_some()
    }
}
