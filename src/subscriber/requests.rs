use alloy::primitives::BlockNumber;

use crate::{log_filter::Request, storage::SubscriberState, subscriber::Subscriber};

/// First block `subscriber` still has to process given its persisted `state`.
///
/// Resumes right after the persisted safe block, or at genesis when nothing was persisted. The
/// result is never below genesis.
#[must_use]
pub fn resume_block(subscriber: &Subscriber, state: Option<&SubscriberState>) -> BlockNumber {
    state
        .and_then(|s| s.safe_block)
        .map_or(subscriber.genesis, |safe_block| safe_block.saturating_add(1))
        .max(subscriber.genesis)
}

/// The elementary requests of `subscriber`, one per filter clause, all resuming at
/// [`resume_block`].
#[must_use]
pub fn requests_from_state(subscriber: &Subscriber, state: Option<&SubscriberState>) -> Vec<Request> {
    let from = resume_block(subscriber, state);
    subscriber.filter.iter().map(|clause| clause.to_request(&subscriber.key, from)).collect()
}
