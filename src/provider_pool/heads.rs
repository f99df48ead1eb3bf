use futures::StreamExt;
use tokio::time::{sleep, timeout};

use crate::{provider_pool::ProviderPool, publisher::HeadCursor};

/// Feed `cursor` with new heads from the pool's pubsub-capable providers, forever.
///
/// The tracker stays on one provider while it keeps delivering heads. When the subscription
/// fails, ends, or stays silent for `subscription_timeout`, it waits `reconnect_delay` and moves
/// on to the next pubsub-capable provider, wrapping around the pool.
pub(crate) async fn track_heads(pool: ProviderPool, cursor: HeadCursor) {
    let candidates: Vec<_> = pool.providers.iter().filter(|p| p.supports_pubsub()).collect();
    if candidates.is_empty() {
        warn!("No provider supports head subscriptions, heads must be advanced by the caller");
        return;
    }

    for (provider_index, provider) in candidates.iter().enumerate().cycle() {
        match provider.subscribe_heads().await {
            Ok(mut heads) => {
                info!(provider_index = provider_index, "Subscribed to new heads");
                loop {
                    match timeout(pool.subscription_timeout, heads.next()).await {
                        Ok(Some(head)) => {
                            trace!(head = head, "New head");
                            cursor.advance(head);
                        }
                        Ok(None) => {
                            warn!(provider_index = provider_index, "Head subscription closed");
                            break;
                        }
                        Err(_) => {
                            error!(
                                timeout_secs = pool.subscription_timeout.as_secs(),
                                "Subscription timeout - no head received, switching provider"
                            );
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(provider_index = provider_index, error = %e, "Failed to subscribe to heads");
            }
        }
        sleep(pool.reconnect_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use alloy::{
        rpc::types::{Filter, Log},
        transports::{RpcError, TransportErrorKind},
    };
    use futures::{future::BoxFuture, stream::BoxStream};

    use super::*;
    use crate::provider_pool::LogProvider;

    /// Emits the queued head batches, one batch per subscription, then stays silent.
    #[derive(Debug, Default)]
    struct Heads {
        batches: Mutex<Vec<Vec<u64>>>,
        subscriptions: AtomicUsize,
    }

    impl LogProvider for Heads {
        fn get_logs<'a>(
            &'a self,
            _filter: &'a Filter,
        ) -> BoxFuture<'a, Result<Vec<Log>, RpcError<TransportErrorKind>>> {
            Box::pin(async { Ok(vec![]) })
        }

        fn subscribe_heads(
            &self,
        ) -> BoxFuture<'_, Result<BoxStream<'static, u64>, RpcError<TransportErrorKind>>> {
            Box::pin(async move {
                self.subscriptions.fetch_add(1, Ordering::SeqCst);
                let mut batches = self.batches.lock().unwrap();
                if batches.is_empty() {
                    return Err(TransportErrorKind::BackendGone.into());
                }
                let batch = batches.remove(0);
                Ok(futures::stream::iter(batch).chain(futures::stream::pending()).boxed())
            })
        }

        fn supports_pubsub(&self) -> bool {
            true
        }
    }

    fn pool_of(provider: Arc<Heads>) -> ProviderPool {
        ProviderPool {
            providers: vec![provider as Arc<dyn LogProvider>],
            call_timeout: Duration::from_secs(1),
            max_retries: 0,
            max_block_range: None,
            reconnect_delay: Duration::from_millis(100),
            subscription_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn heads_reach_cursor_and_silence_triggers_resubscribe() {
        let provider = Arc::new(Heads {
            batches: Mutex::new(vec![vec![10, 11], vec![12]]),
            ..Default::default()
        });
        let cursor = HeadCursor::default();
        let task = tokio::spawn(track_heads(pool_of(provider.clone()), cursor.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cursor.head(), Some(11));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(cursor.head(), Some(12));
        assert_eq!(provider.subscriptions.load(Ordering::SeqCst), 2);

        task.abort();
    }

    #[tokio::test]
    async fn tracker_exits_without_pubsub_providers() {
        #[derive(Debug)]
        struct HttpOnly;
        impl LogProvider for HttpOnly {
            fn get_logs<'a>(
                &'a self,
                _filter: &'a Filter,
            ) -> BoxFuture<'a, Result<Vec<Log>, RpcError<TransportErrorKind>>> {
                Box::pin(async { Ok(vec![]) })
            }
        }

        let mut pool = pool_of(Arc::new(Heads::default()));
        pool.providers = vec![Arc::new(HttpOnly)];
        let cursor = HeadCursor::default();

        track_heads(pool, cursor.clone()).await;

        assert_eq!(cursor.head(), None);
    }
}
