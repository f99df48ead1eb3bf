use std::ops::RangeInclusive;

use alloy::primitives::BlockNumber;

/// Splits `[from, to]` into at most `count` contiguous, inclusive chunks of equal size.
///
/// The last chunk absorbs the remainder so the chunks always cover the whole range. When the
/// range holds fewer blocks than `count`, one chunk per block is returned. An empty range
/// (`from > to`) or `count == 0` yields no chunks.
#[must_use]
pub fn split_chunks(from: BlockNumber, to: BlockNumber, count: u64) -> Vec<RangeInclusive<BlockNumber>> {
    if from > to || count == 0 {
        return Vec::new();
    }
    let total = to - from + 1;
    let count = count.min(total);
    let size = total / count;
    (0..count)
        .map(|i| {
            let start = from + size * i;
            let end = if i + 1 == count { to } else { start + size - 1 };
            start..=end
        })
        .collect()
}

/// Splits `[from, to]` into consecutive inclusive chunks of at most `max_block_range` blocks.
///
/// Every chunk but the last holds exactly `max_block_range` blocks.
#[must_use]
pub fn split_by_size(
    from: BlockNumber,
    to: BlockNumber,
    max_block_range: u64,
) -> Vec<RangeInclusive<BlockNumber>> {
    if from > to || max_block_range == 0 {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut start = from;
    loop {
        let end = start.saturating_add(max_block_range - 1).min(to);
        chunks.push(start..=end);
        if end == to {
            break;
        }
        start = end + 1;
    }
    chunks
}
