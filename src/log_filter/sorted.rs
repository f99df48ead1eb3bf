use std::cmp::Ordering;

use alloy::{primitives::BlockNumber, rpc::types::Log};

/// The ordering key of a log. Two logs with equal keys are the same log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogKey {
    pub block_number: BlockNumber,
    pub log_index: u64,
}

/// Returns the ordering key of `log`, or `None` for a pending log without a block number.
///
/// A missing log index is treated as `0`, matching providers that omit it for the first log of
/// a block.
#[must_use]
pub fn log_key(log: &Log) -> Option<LogKey> {
    Some(LogKey { block_number: log.block_number?, log_index: log.log_index.unwrap_or_default() })
}

/// Orders logs by `(block_number, log_index)`. Pending logs sort first.
#[must_use]
pub fn compare_logs(a: &Log, b: &Log) -> Ordering {
    log_key(a).cmp(&log_key(b))
}

/// Whether `a` and `b` are the same log by ordering key.
#[must_use]
pub fn equal_logs(a: &Log, b: &Log) -> bool {
    compare_logs(a, b) == Ordering::Equal
}

/// Merges two sorted, duplicate-free log sequences into one, keeping a single copy of logs
/// present in both (the copy from `b`).
///
/// Sortedness and uniqueness of the inputs are preconditions and are not checked.
#[must_use]
pub fn merge_two_uniq_sorted_logs(a: Vec<Log>, b: Vec<Log>) -> Vec<Log> {
    if a.is_empty() {
        return b;
    }
    if b.is_empty() {
        return a;
    }

    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    loop {
        let next = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => match compare_logs(x, y) {
                Ordering::Less => a.next(),
                Ordering::Greater => b.next(),
                Ordering::Equal => {
                    a.next();
                    b.next()
                }
            },
            (Some(_), None) => a.next(),
            (None, Some(_)) => b.next(),
            (None, None) => break,
        };
        merged.extend(next);
    }
    merged
}

/// Folds [`merge_two_uniq_sorted_logs`] over `lists` from left to right.
#[must_use]
pub fn merge_uniq_sorted_logs<I>(lists: I) -> Vec<Log>
where
    I: IntoIterator<Item = Vec<Log>>,
{
    lists.into_iter().fold(Vec::new(), merge_two_uniq_sorted_logs)
}

/// Sorts arbitrary logs by ordering key and drops duplicates, keeping the last copy.
#[must_use]
pub fn sort_uniq_logs(mut logs: Vec<Log>) -> Vec<Log> {
    logs.sort_by(compare_logs);
    let mut out: Vec<Log> = Vec::with_capacity(logs.len());
    for log in logs {
        match out.last_mut() {
            Some(last) if equal_logs(last, &log) => *last = log,
            _ => out.push(log),
        }
    }
    out
}

/// Normalizes a provider response: pending logs are dropped, missing log and transaction
/// indices become `0`, and the result is sorted and duplicate-free.
#[must_use]
pub fn normalize_logs(logs: Vec<Log>) -> Vec<Log> {
    let total = logs.len();
    let logs: Vec<Log> = logs
        .into_iter()
        .filter(|log| log.block_number.is_some())
        .map(|mut log| {
            log.log_index.get_or_insert(0);
            log.transaction_index.get_or_insert(0);
            log
        })
        .collect();
    if logs.len() != total {
        warn!(dropped = total - logs.len(), "Dropped pending logs without a block number");
    }
    if logs.is_sorted_by(|a, b| compare_logs(a, b) == Ordering::Less) {
        logs
    } else {
        sort_uniq_logs(logs)
    }
}
