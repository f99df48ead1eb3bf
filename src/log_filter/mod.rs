//! Pure log-filter algebra.
//!
//! Subscriber interest is expressed as elementary [`Request`]s. The processing cycle groups them
//! by shape with [`partition_requests`], widens each group into a single [`MergedRequest`] with
//! [`merge_requests`], fetches once per group, and then narrows the shared result back down per
//! subscriber with [`filter_logs`]. Merging only ever over-approximates, so re-filtering a merged
//! result never loses a log a subscriber asked for.

mod filter;
mod merge;
mod range;
mod request;
mod sorted;

pub use filter::{filter_logs, matches_request};
pub use merge::{merge_address, merge_requests, merge_topics, partition_requests};
pub use range::{split_by_size, split_chunks};
pub use request::{MergedRequest, Request, TOPIC_POSITIONS, Topics};
pub use sorted::{
    LogKey, compare_logs, equal_logs, log_key, merge_two_uniq_sorted_logs, merge_uniq_sorted_logs,
    normalize_logs, sort_uniq_logs,
};
