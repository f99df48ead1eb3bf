use std::sync::PoisonError;

use alloy::{primitives::BlockNumber, rpc::types::Log};

use crate::{
    PublisherError,
    log_filter::{filter_logs, merge_uniq_sorted_logs},
    publisher::{ChainPublisher, cycle::Pending},
    storage::SubscriberState,
    subscriber::resume_block,
};

/// Highest block whose logs are folded durably this cycle.
///
/// `max(from - 1, head - safe_depth)`, clamped to the cycle's effective upper bound: `to_block`
/// when the range is bounded, and never above `head`. `None` while neither term exists, i.e. the
/// subscriber starts at block 0 and the chain is not yet `safe_depth` blocks long.
pub(crate) fn safe_block(
    from: BlockNumber,
    head: BlockNumber,
    safe_depth: u64,
    to_block: Option<BlockNumber>,
) -> Option<BlockNumber> {
    let bound = to_block.map_or(head, |to| to.min(head));
    let resumed = from.checked_sub(1);
    let settled = head.checked_sub(safe_depth);
    resumed.max(settled).map(|block| block.min(bound))
}

/// Splits sorted `logs` into those at or below `safe_block` and the rest.
pub(crate) fn split_at_safe_block(logs: &[Log], safe_block: Option<BlockNumber>) -> (&[Log], &[Log]) {
    let split = logs.partition_point(|log| {
        safe_block.is_some_and(|safe| log.block_number.is_some_and(|block| block <= safe))
    });
    logs.split_at(split)
}

impl ChainPublisher {
    /// Serve one subscriber its share of the cycle logs.
    ///
    /// The tentative fold starts from the subscriber's initial changes, so the overlay holds only
    /// the logs above the safe block. Both folds run before anything is written: the durable
    /// record (changes and safe block together) is persisted first, then the overlay entry is
    /// replaced. A failing fold leaves both untouched.
    pub(crate) async fn apply_subscriber(
        &self,
        pending: Pending,
        head: BlockNumber,
        to_block: Option<BlockNumber>,
        logs: &[Log],
    ) -> Result<(), PublisherError> {
        let Pending { subscriber, state, requests } = pending;
        let key = subscriber.key.as_str();
        let from = resume_block(&subscriber, state.as_ref());
        if from > to_block.map_or(head, |to| to.min(head)) {
            trace!(key = key, from = from, "Subscriber is past the cycle range");
            return Ok(());
        }

        let own_logs = merge_uniq_sorted_logs(requests.iter().map(|r| filter_logs(logs, r)));
        let safe_block = safe_block(from, head, subscriber.safe_depth, to_block);
        let (safe_logs, unsafe_logs) = split_at_safe_block(&own_logs, safe_block);

        let storage = &*self.inner.storage;
        let initial = SubscriberState::initial(subscriber.genesis);
        let prior = state.as_ref().map_or(&initial.changes, |state| &state.changes);
        let application_error =
            |source| PublisherError::Application { key: key.to_owned(), source };

        let changes = subscriber
            .reducer
            .apply(storage, prior, safe_logs, false)
            .await
            .map_err(application_error)?;
        let unsafe_changes = subscriber
            .reducer
            .apply(storage, &initial.changes, unsafe_logs, true)
            .await
            .map_err(application_error)?;

        storage
            .set(key, SubscriberState { safe_block, changes })
            .await
            .map_err(|source| PublisherError::Storage { key: key.to_owned(), source })?;
        self.inner
            .overlay
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), unsafe_changes);

        debug!(
            key = key,
            from = from,
            safe_block = ?safe_block,
            safe_logs = safe_logs.len(),
            unsafe_logs = unsafe_logs.len(),
            "Applied logs"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::test_utils::make_log;

    #[test]
    fn safe_block_trails_head_by_safe_depth() {
        assert_eq!(safe_block(100, 150, 10, None), Some(140));
        assert_eq!(safe_block(100, 150, 0, None), Some(150));
    }

    #[test]
    fn safe_block_never_moves_back() {
        // Subscriber already folded up to 145; a shallower head must not rewind it.
        assert_eq!(safe_block(146, 150, 10, None), Some(145));
    }

    #[test]
    fn safe_block_is_clamped_to_bounded_range() {
        assert_eq!(safe_block(0, 5000, 10, Some(4000)), Some(4000));
        assert_eq!(safe_block(0, 5000, 10, Some(5000)), Some(4990));
    }

    #[test]
    fn safe_block_is_none_on_a_short_chain() {
        assert_eq!(safe_block(0, 5, 10, None), None);
        assert_eq!(safe_block(3, 5, 10, None), Some(2));
    }

    #[test]
    fn split_keeps_safe_block_on_the_safe_side() {
        let logs: Vec<_> = [105, 105, 120, 140, 145]
            .iter()
            .enumerate()
            .map(|(i, b)| make_log(Address::ZERO, &[], *b, i as u64))
            .collect();

        let (safe, tentative) = split_at_safe_block(&logs, Some(140));
        assert_eq!(safe.len(), 4);
        assert_eq!(tentative.len(), 1);
        assert_eq!(tentative[0].block_number, Some(145));

        let (safe, tentative) = split_at_safe_block(&logs, None);
        assert!(safe.is_empty());
        assert_eq!(tentative.len(), 5);
    }
}
