use std::{sync::Arc, time::Duration};

use alloy::rpc::types::{Filter, Log};
use backon::Retryable;
use futures::future::try_join_all;
use rand::Rng;
use tokio::time::timeout;

use crate::{
    log_filter::{merge_uniq_sorted_logs, normalize_logs, split_by_size},
    provider_pool::{Error, JitterBuilder, LogProvider},
};

/// A pool of interchangeable providers serving the same chain.
///
/// Cloning is cheap; clones share the underlying providers.
#[derive(Clone, Debug)]
pub struct ProviderPool {
    pub(crate) providers: Vec<Arc<dyn LogProvider>>,
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) max_block_range: Option<u64>,
    pub(crate) reconnect_delay: Duration,
    pub(crate) subscription_timeout: Duration,
}

impl ProviderPool {
    /// Number of providers in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Index of the provider used for an attempt.
    ///
    /// With a seed in `[0, 1)` the index is `floor(len * seed)`, so equal seeds always pick the
    /// same provider. Without one the index is uniformly random.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pick_index(&self, seed: Option<f64>) -> usize {
        let len = self.providers.len();
        if len <= 1 {
            return 0;
        }
        match seed {
            Some(seed) => ((len as f64 * seed.clamp(0.0, 1.0)).floor() as usize).min(len - 1),
            None => rand::thread_rng().gen_range(0..len),
        }
    }

    /// Fetch logs for `filter` with retry, per-attempt timeout and provider selection.
    ///
    /// When the pool has a `max_block_range` and `filter` is bounded on both ends by a wider
    /// range, the range is fetched in chunks concurrently and the results are merged.
    ///
    /// # Errors
    ///
    /// * [`Error::Protocol`] as soon as a provider returns something that is not a log list.
    /// * The error of the last attempt once all retries are exhausted.
    pub async fn get_logs(&self, filter: &Filter, seed: Option<f64>) -> Result<Vec<Log>, Error> {
        let bounds = filter.get_from_block().zip(filter.get_to_block());
        if let (Some(max_block_range), Some((from, to))) = (self.max_block_range, bounds) {
            let chunks = split_by_size(from, to, max_block_range);
            if chunks.len() > 1 {
                debug!(
                    from_block = from,
                    to_block = to,
                    chunks = chunks.len(),
                    "Splitting eth_getLogs range"
                );
                let fetches = chunks.into_iter().map(|range| {
                    let chunk = filter.clone().from_block(*range.start()).to_block(*range.end());
                    async move { self.try_get_logs(&chunk, seed).await.map(normalize_logs) }
                });
                let results = try_join_all(fetches).await?;
                return Ok(merge_uniq_sorted_logs(results));
            }
        }
        self.try_get_logs(filter, seed).await
    }

    async fn try_get_logs(&self, filter: &Filter, seed: Option<f64>) -> Result<Vec<Log>, Error> {
        trace!(seed = ?seed, "eth_getLogs called");
        let result = (|| async {
            let provider = &self.providers[self.pick_index(seed)];
            timeout(self.call_timeout, provider.get_logs(filter))
                .await
                .map_err(Error::from)?
                .map_err(Error::from)
        })
        .retry(JitterBuilder::new(self.max_retries))
        .when(Error::is_retryable)
        .notify(|err: &Error, dur: Duration| {
            warn!(error = %err, delay_ms = dur.as_millis(), "eth_getLogs failed, retrying");
        })
        .sleep(tokio::time::sleep)
        .await;

        if let Err(e) = &result {
            error!(error = %e, "eth_getLogs failed");
        }
        result
    }
}
