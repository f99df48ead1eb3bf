use std::{collections::BTreeMap, sync::Arc};

use alloy::{primitives::BlockNumber, rpc::types::Log};
use futures::future::try_join_all;
use rand::Rng;

use crate::{
    PublisherError,
    log_filter::{
        Request, merge_requests, merge_uniq_sorted_logs, normalize_logs, partition_requests,
    },
    publisher::ChainPublisher,
    storage::SubscriberState,
    subscriber::{Subscriber, requests_from_state},
};

/// A subscriber together with what the cycle loaded for it.
pub(crate) struct Pending {
    pub(crate) subscriber: Arc<Subscriber>,
    pub(crate) state: Option<SubscriberState>,
    pub(crate) requests: Vec<Request>,
}

impl ChainPublisher {
    /// Run one processing cycle for `head` and return the head it processed.
    ///
    /// The loop calls this for every new head; embedders that drive the head themselves can call
    /// it directly. Nothing is persisted for a subscriber whose cycle fails, so retrying the same
    /// head is safe.
    ///
    /// # Errors
    ///
    /// The first fetch, reducer or storage error of the cycle. Subscribers of earlier `order`
    /// groups keep what they committed.
    pub async fn process_head(&self, head: BlockNumber) -> Result<BlockNumber, PublisherError> {
        let pending = self.load_subscribers().await?;
        let requests: Vec<Request> =
            pending.iter().flat_map(|p| p.requests.iter().cloned()).collect();

        let Some(from_block) = requests.iter().map(|r| r.from).min() else {
            return Ok(head);
        };
        if from_block > head {
            trace!(head = head, from_block = from_block, "All subscribers are up to date");
            return Ok(head);
        }

        let to_block = (head - from_block > self.inner.config.range_threshold).then_some(head);
        let seed = (self.inner.config.sticky_unsafe_provider && to_block.is_none())
            .then(|| rand::thread_rng().gen_range(0.0..1.0));

        let logs = self.fetch_logs(&requests, from_block, to_block, seed).await?;
        info!(
            head = head,
            from_block = from_block,
            to_block = ?to_block,
            blocks = head - from_block + 1,
            logs = logs.len(),
            "Fetched cycle logs"
        );

        for group in group_by_order(pending) {
            try_join_all(group.into_iter().map(|p| self.apply_subscriber(p, head, to_block, &logs)))
                .await?;
        }
        Ok(head)
    }

    async fn load_subscribers(&self) -> Result<Vec<Pending>, PublisherError> {
        let storage = &*self.inner.storage;
        let loads = self.inner.registry.snapshot().into_iter().map(|subscriber| async move {
            let state = storage
                .get(&subscriber.key)
                .await
                .map_err(|source| PublisherError::Storage { key: subscriber.key.clone(), source })?;
            let requests = requests_from_state(&subscriber, state.as_ref());
            Ok::<_, PublisherError>(Pending { subscriber, state, requests })
        });
        try_join_all(loads).await
    }

    /// Fetch every partition of `requests` over `[from_block, to_block]` concurrently and merge
    /// the results into one sorted, duplicate-free stream.
    async fn fetch_logs(
        &self,
        requests: &[Request],
        from_block: BlockNumber,
        to_block: Option<BlockNumber>,
        seed: Option<f64>,
    ) -> Result<Vec<Log>, PublisherError> {
        let pool = &self.inner.pool;
        let partitions = partition_requests(requests);
        let fetches = partitions
            .iter()
            .filter_map(|partition| merge_requests(partition, from_block, to_block))
            .map(|merged| async move {
                let logs = pool.get_logs(&merged.to_filter(), seed).await?;
                trace!(
                    address = ?merged.address,
                    logs = logs.len(),
                    "Fetched partition"
                );
                Ok::<_, PublisherError>(normalize_logs(logs))
            });
        let results = try_join_all(fetches).await?;
        debug!(partitions = partitions.len(), fetched = results.len(), "Merged partitions");
        Ok(merge_uniq_sorted_logs(results))
    }
}

/// Groups by ascending `order`, keeping registration order inside a group.
fn group_by_order(pending: Vec<Pending>) -> impl Iterator<Item = Vec<Pending>> {
    let mut groups: BTreeMap<i64, Vec<Pending>> = BTreeMap::new();
    for p in pending {
        groups.entry(p.subscriber.order).or_default().push(p);
    }
    groups.into_values()
}
