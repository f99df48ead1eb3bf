use alloy::rpc::types::Log;

use super::{
    request::{Request, TOPIC_POSITIONS, Topics},
    sorted::log_key,
};

/// Returns the logs that satisfy every constraint of `request`, preserving their order.
///
/// Logs without a block number (pending logs) never match.
#[must_use]
pub fn filter_logs(logs: &[Log], request: &Request) -> Vec<Log> {
    logs.iter().filter(|log| matches_request(log, request)).cloned().collect()
}

/// Whether a single log satisfies the block range, address and topic constraints of `request`.
#[must_use]
pub fn matches_request(log: &Log, request: &Request) -> bool {
    let Some(key) = log_key(log) else {
        return false;
    };
    if key.block_number < request.from {
        return false;
    }
    if request.to.is_some_and(|to| key.block_number > to) {
        return false;
    }
    if let Some(addresses) = &request.address {
        if !addresses.contains(&log.address()) {
            return false;
        }
    }
    matches_topics(log, &request.topics)
}

/// Positions are combined with AND, values within a position with OR. A constrained position
/// the log does not have fails the match.
pub(crate) fn matches_topics(log: &Log, topics: &Topics) -> bool {
    let actual = log.topics();
    topics.iter().take(TOPIC_POSITIONS).enumerate().all(|(i, accepted)| {
        let Some(accepted) = accepted else { return true };
        actual.get(i).is_some_and(|topic| accepted.contains(topic))
    })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256, address, b256};

    use super::*;
    use crate::test_utils::make_log;

    const TOKEN: Address = address!("0x00000000000000000000000000000000000000aa");
    const OTHER: Address = address!("0x00000000000000000000000000000000000000bb");
    const TRANSFER: B256 =
        b256!("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
    const WALLET: B256 =
        b256!("0x0000000000000000000000008894e0a0c962cb723c1976a4421c95949be2d4e3");

    fn request(address: Option<Vec<Address>>, topics: Topics, from: u64, to: Option<u64>) -> Request {
        Request { key: "k".into(), address, topics, from, to }
    }

    #[test]
    fn block_range_is_inclusive() {
        let logs: Vec<_> = (1..=5).map(|b| make_log(TOKEN, &[TRANSFER], b, 0)).collect();
        let out = filter_logs(&logs, &request(None, Topics::default(), 2, Some(4)));
        let blocks: Vec<_> = out.iter().filter_map(|l| l.block_number).collect();
        assert_eq!(blocks, vec![2, 3, 4]);
    }

    #[test]
    fn address_list_is_membership() {
        let logs = vec![
            make_log(TOKEN, &[TRANSFER], 1, 0),
            make_log(OTHER, &[TRANSFER], 1, 1),
            make_log(Address::ZERO, &[TRANSFER], 1, 2),
        ];
        let out = filter_logs(&logs, &request(Some(vec![TOKEN, OTHER]), Topics::default(), 0, None));
        assert_eq!(out.len(), 2);
        let out = filter_logs(&logs, &request(Some(vec![OTHER]), Topics::default(), 0, None));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address(), OTHER);
    }

    #[test]
    fn null_topic_positions_are_wildcards() {
        let logs = vec![
            make_log(TOKEN, &[TRANSFER, B256::ZERO, WALLET], 1, 0),
            make_log(TOKEN, &[TRANSFER, WALLET, B256::ZERO], 1, 1),
            make_log(TOKEN, &[TRANSFER], 1, 2),
        ];
        let to_wallet = request(None, [Some(vec![TRANSFER]), None, Some(vec![WALLET]), None], 0, None);
        let out = filter_logs(&logs, &to_wallet);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].log_index, Some(0));

        let either = request(
            None,
            [None, Some(vec![WALLET, B256::ZERO]), None, None],
            0,
            None,
        );
        assert_eq!(filter_logs(&logs, &either).len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let logs = vec![
            make_log(TOKEN, &[TRANSFER, WALLET], 3, 0),
            make_log(OTHER, &[TRANSFER, WALLET], 4, 0),
            make_log(TOKEN, &[WALLET], 5, 0),
            make_log(TOKEN, &[TRANSFER, WALLET], 9, 1),
        ];
        let r = request(Some(vec![TOKEN]), [Some(vec![TRANSFER]), None, None, None], 4, None);
        let once = filter_logs(&logs, &r);
        let twice = filter_logs(&once, &r);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn pending_logs_never_match() {
        let mut log = make_log(TOKEN, &[TRANSFER], 1, 0);
        log.block_number = None;
        assert!(!matches_request(&log, &request(None, Topics::default(), 0, None)));
    }
}
