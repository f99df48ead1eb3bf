//! Subscriber registration types.
//!
//! A subscriber is described with a [`SubscriberSpec`] and validated into a [`Subscriber`] when it
//! is registered with the publisher. Its interest is a list of [`FilterClause`]s; each clause turns
//! into one elementary [`Request`](crate::log_filter::Request) per cycle.

mod reducer;
pub(crate) mod requests;

use std::{fmt, sync::Arc};

use alloy::primitives::{Address, B256, BlockNumber};

use crate::{
    error::ConfigError,
    log_filter::{Request, TOPIC_POSITIONS, Topics},
};

pub use reducer::{FnReducer, LogReducer, ReducerError, reducer_fn};
pub use requests::{requests_from_state, resume_block};

/// One `{address?, topics?}` alternative of a subscriber's filter.
///
/// An absent address matches any emitter. `topics` is positional; `None` at a position is a
/// wildcard and a list matches any of its values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterClause {
    pub address: Option<Vec<Address>>,
    pub topics: Vec<Option<Vec<B256>>>,
}

impl FilterClause {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an emitter address. Repeated calls widen the clause to any of the addresses.
    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.address.get_or_insert_with(Vec::new).push(address);
        self
    }

    /// Constrain topic `position` to any of `values`, leaving earlier unset positions as
    /// wildcards.
    #[must_use]
    pub fn topic(mut self, position: usize, values: impl IntoIterator<Item = B256>) -> Self {
        if self.topics.len() <= position {
            self.topics.resize(position + 1, None);
        }
        self.topics[position] = Some(values.into_iter().collect());
        self
    }

    /// Shorthand for constraining topic 0, the event signature.
    #[must_use]
    pub fn event(self, signature: B256) -> Self {
        self.topic(0, [signature])
    }

    pub(crate) fn to_request(&self, key: &str, from: BlockNumber) -> Request {
        let mut topics = Topics::default();
        for (slot, topic) in topics.iter_mut().zip(&self.topics) {
            slot.clone_from(topic);
        }
        Request { key: key.to_owned(), address: self.address.clone(), topics, from, to: None }
    }
}

/// Unvalidated description of a subscriber, built with chained setters.
#[derive(Default)]
pub struct SubscriberSpec {
    key: String,
    filter: Vec<FilterClause>,
    genesis: Option<BlockNumber>,
    safe_depth: Option<u64>,
    reducer: Option<Arc<dyn LogReducer>>,
    order: i64,
}

impl SubscriberSpec {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), ..Self::default() }
    }

    /// Add a filter clause. A log matching any clause is delivered.
    #[must_use]
    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.filter.push(clause);
        self
    }

    #[must_use]
    pub fn filters(mut self, clauses: impl IntoIterator<Item = FilterClause>) -> Self {
        self.filter.extend(clauses);
        self
    }

    /// First block of interest. Defaults to 0.
    #[must_use]
    pub fn genesis(mut self, genesis: BlockNumber) -> Self {
        self.genesis = Some(genesis);
        self
    }

    /// Number of blocks behind the head after which logs are folded durably. Required.
    #[must_use]
    pub fn safe_depth(mut self, safe_depth: u64) -> Self {
        self.safe_depth = Some(safe_depth);
        self
    }

    #[must_use]
    pub fn reducer(mut self, reducer: impl LogReducer + 'static) -> Self {
        self.reducer = Some(Arc::new(reducer));
        self
    }

    /// Distribution group. Groups run in ascending order within a cycle, so a subscriber can
    /// depend on state committed by a lower group. Defaults to 0.
    #[must_use]
    pub fn order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub(crate) fn validate(self) -> Result<Subscriber, ConfigError> {
        if self.key.is_empty() {
            return Err(ConfigError::MissingKey);
        }
        if self.filter.is_empty() {
            return Err(ConfigError::MissingFilter(self.key));
        }
        if let Some((clause, count)) = self
            .filter
            .iter()
            .map(|c| c.topics.len())
            .enumerate()
            .find(|(_, count)| *count > TOPIC_POSITIONS)
        {
            return Err(ConfigError::TooManyTopics { key: self.key, clause, count });
        }
        let Some(safe_depth) = self.safe_depth else {
            return Err(ConfigError::MissingSafeDepth(self.key));
        };
        let Some(reducer) = self.reducer else {
            return Err(ConfigError::MissingReducer(self.key));
        };
        let genesis = self.genesis.unwrap_or_else(|| {
            warn!(key = %self.key, "Missing genesis, defaulting to block 0");
            0
        });

        Ok(Subscriber {
            key: self.key,
            filter: self.filter,
            genesis,
            safe_depth,
            reducer,
            order: self.order,
        })
    }
}

/// A validated, registered subscriber.
#[derive(Clone)]
pub struct Subscriber {
    pub(crate) key: String,
    pub(crate) filter: Vec<FilterClause>,
    pub(crate) genesis: BlockNumber,
    pub(crate) safe_depth: u64,
    pub(crate) reducer: Arc<dyn LogReducer>,
    pub(crate) order: i64,
}

impl Subscriber {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn genesis(&self) -> BlockNumber {
        self.genesis
    }

    #[must_use]
    pub fn safe_depth(&self) -> u64 {
        self.safe_depth
    }

    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("key", &self.key)
            .field("filter", &self.filter)
            .field("genesis", &self.genesis)
            .field("safe_depth", &self.safe_depth)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
