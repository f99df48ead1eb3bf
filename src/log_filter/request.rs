use std::fmt::{Display, Formatter};

use alloy::{
    primitives::{Address, B256, BlockNumber},
    rpc::types::Filter,
};

/// Number of indexed topic positions an EVM log can carry.
pub const TOPIC_POSITIONS: usize = 4;

/// Per-position topic constraints. `None` is a wildcard, `Some(values)` matches any of `values`.
pub type Topics = [Option<Vec<B256>>; TOPIC_POSITIONS];

/// An elementary log request derived from one subscriber filter clause.
///
/// Both block bounds are inclusive. An open `to` means "up to the current head"; the bound is
/// decided by the processing cycle, not by the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub key: String,
    pub address: Option<Vec<Address>>,
    pub topics: Topics,
    pub from: BlockNumber,
    pub to: Option<BlockNumber>,
}

impl Request {
    /// Whether the address is constrained and which topic positions are, in that order.
    ///
    /// Requests with equal shapes can be merged without widening any constraint they share.
    #[must_use]
    pub fn shape(&self) -> [bool; TOPIC_POSITIONS + 1] {
        let mut shape = [self.address.is_some(); TOPIC_POSITIONS + 1];
        for (slot, topic) in shape[1..].iter_mut().zip(&self.topics) {
            *slot = topic.is_some();
        }
        shape
    }

    /// Whether `[from, to]` intersects the request's own block range.
    #[must_use]
    pub fn intersects(&self, from: BlockNumber, to: Option<BlockNumber>) -> bool {
        to.is_none_or(|to| self.from <= to) && self.to.is_none_or(|own_to| own_to >= from)
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}..", self.key, self.from)?;
        if let Some(to) = self.to {
            write!(f, "{to}")?;
        }
        Ok(())
    }
}

/// The over-approximating union of several [`Request`]s, ready to be sent as one `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRequest {
    pub address: Option<Vec<Address>>,
    pub topics: Topics,
    pub from_block: BlockNumber,
    pub to_block: Option<BlockNumber>,
}

impl MergedRequest {
    /// Builds the JSON-RPC filter. An open `to_block` is left out so the node answers up to its
    /// own latest block.
    #[must_use]
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new().from_block(self.from_block);
        if let Some(to_block) = self.to_block {
            filter = filter.to_block(to_block);
        }
        if let Some(address) = &self.address {
            filter = filter.address(address.clone());
        }
        let [topic0, topic1, topic2, topic3] = &self.topics;
        if let Some(values) = topic0 {
            filter = filter.event_signature(values.clone());
        }
        if let Some(values) = topic1 {
            filter = filter.topic1(values.clone());
        }
        if let Some(values) = topic2 {
            filter = filter.topic2(values.clone());
        }
        if let Some(values) = topic3 {
            filter = filter.topic3(values.clone());
        }
        filter
    }
}

impl From<&MergedRequest> for Filter {
    fn from(request: &MergedRequest) -> Self {
        request.to_filter()
    }
}
