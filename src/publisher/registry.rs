use std::sync::{Arc, PoisonError, RwLock};

use crate::subscriber::Subscriber;

/// Insertion-ordered set of subscribers keyed by subscriber key.
///
/// The processing cycle works on a [`snapshot`](Registry::snapshot), so registrations made while a
/// cycle runs take effect on the next one.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
}

impl Registry {
    /// Add `subscriber`, replacing in place any subscriber with the same key. Returns whether a
    /// subscriber was replaced.
    pub(crate) fn insert(&self, subscriber: Subscriber) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let subscriber = Arc::new(subscriber);
        if let Some(slot) = subscribers.iter_mut().find(|s| s.key == subscriber.key) {
            *slot = subscriber;
            return true;
        }
        subscribers.push(subscriber);
        false
    }

    /// Remove the subscriber registered under `key`. Returns whether one was registered.
    pub(crate) fn remove(&self, key: &str) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.key != key);
        subscribers.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).iter().any(|s| s.key == key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::{FilterClause, SubscriberSpec, reducer_fn};

    fn subscriber(key: &str, safe_depth: u64) -> Subscriber {
        SubscriberSpec::new(key)
            .filter(FilterClause::new())
            .safe_depth(safe_depth)
            .reducer(reducer_fn(|prior, _, _| Ok(prior.clone())))
            .validate()
            .unwrap()
    }

    #[test]
    fn replacement_keeps_insertion_position() {
        let registry = Registry::default();
        assert!(!registry.insert(subscriber("a", 1)));
        assert!(!registry.insert(subscriber("b", 1)));
        assert!(registry.insert(subscriber("a", 5)));

        let keys: Vec<_> = registry.snapshot().iter().map(|s| s.key.clone()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(registry.snapshot()[0].safe_depth, 5);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_changes() {
        let registry = Registry::default();
        registry.insert(subscriber("a", 1));
        let snapshot = registry.snapshot();

        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(registry.is_empty());
        assert!(!registry.contains("a"));
        assert_eq!(snapshot.len(), 1);
    }
}
