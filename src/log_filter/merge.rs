use alloy::primitives::{Address, BlockNumber};

use super::request::{MergedRequest, Request, TOPIC_POSITIONS, Topics};

/// Unions the address constraints of `requests`.
///
/// Returns `None` (any address) as soon as one request is unconstrained, otherwise the
/// deduplicated addresses in first-seen order.
#[must_use]
pub fn merge_address<'a, I>(requests: I) -> Option<Vec<Address>>
where
    I: IntoIterator<Item = &'a Request>,
{
    let mut merged: Vec<Address> = Vec::new();
    for request in requests {
        for address in request.address.as_ref()? {
            if !merged.contains(address) {
                merged.push(*address);
            }
        }
    }
    (!merged.is_empty()).then_some(merged)
}

/// Unions topic constraints position by position.
///
/// A position stays constrained only when every input constrains it; the merged values are the
/// deduplicated union. The result therefore matches every log matched by any input.
#[must_use]
pub fn merge_topics<'a, I>(topics_list: I) -> Topics
where
    I: IntoIterator<Item = &'a Topics>,
{
    let mut merged: Topics = std::array::from_fn(|_| Some(Vec::new()));
    let mut seen_any = false;
    for topics in topics_list {
        seen_any = true;
        for (slot, constraint) in merged.iter_mut().zip(topics) {
            match constraint {
                None => *slot = None,
                Some(constraint) => {
                    if let Some(values) = slot {
                        for topic in constraint {
                            if !values.contains(topic) {
                                values.push(*topic);
                            }
                        }
                    }
                }
            }
        }
    }
    if !seen_any {
        return Topics::default();
    }
    for slot in &mut merged {
        if slot.as_ref().is_some_and(Vec::is_empty) {
            *slot = None;
        }
    }
    merged
}

/// Merges the requests that intersect `[from_block, to_block]` into one request spanning that
/// range. Returns `None` when no request intersects it.
#[must_use]
pub fn merge_requests(
    requests: &[Request],
    from_block: BlockNumber,
    to_block: Option<BlockNumber>,
) -> Option<MergedRequest> {
    let survivors: Vec<&Request> =
        requests.iter().filter(|r| r.intersects(from_block, to_block)).collect();
    if survivors.is_empty() {
        trace!(from_block = from_block, "No request in range");
        return None;
    }
    Some(MergedRequest {
        address: merge_address(survivors.iter().copied()),
        topics: merge_topics(survivors.iter().map(|r| &r.topics)),
        from_block,
        to_block,
    })
}

/// Groups requests by shape: whether the address is constrained and which topic positions are.
///
/// The split is done as successive binary partitions (address, then each topic position), so the
/// group order is deterministic: constrained before unconstrained at every level, and requests
/// keep their relative order inside a group. Empty groups are dropped.
#[must_use]
pub fn partition_requests(requests: &[Request]) -> Vec<Vec<Request>> {
    let mut parts: Vec<Vec<Request>> = vec![requests.to_vec()];
    for position in 0..=TOPIC_POSITIONS {
        parts = parts
            .into_iter()
            .flat_map(|part| {
                let (constrained, unconstrained): (Vec<_>, Vec<_>) =
                    part.into_iter().partition(|r| r.shape()[position]);
                [constrained, unconstrained]
            })
            .filter(|part| !part.is_empty())
            .collect();
    }
    parts
}
