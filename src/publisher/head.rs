use std::{sync::Arc, time::Duration};

use alloy::primitives::BlockNumber;
use tokio::sync::watch;
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};

/// The latest chain head known to a publisher.
///
/// Written by the head tracker (or by the embedder through [`HeadCursor::advance`]) and read as a
/// fresh snapshot by the processing loop. Clones share the same cursor.
#[derive(Debug, Clone)]
pub struct HeadCursor {
    tx: Arc<watch::Sender<Option<BlockNumber>>>,
}

impl Default for HeadCursor {
    fn default() -> Self {
        Self { tx: Arc::new(watch::Sender::new(None)) }
    }
}

impl HeadCursor {
    /// Record a newly observed head. Lower heads are accepted too, since a reorg may shorten the
    /// chain.
    pub fn advance(&self, head: BlockNumber) {
        self.tx.send_if_modified(|current| {
            if *current == Some(head) {
                return false;
            }
            *current = Some(head);
            true
        });
    }

    /// The latest head, if any was observed yet.
    #[must_use]
    pub fn head(&self) -> Option<BlockNumber> {
        *self.tx.borrow()
    }

    /// A receiver notified on every head change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<BlockNumber>> {
        self.tx.subscribe()
    }

    /// Every head from the current one on. Intermediate heads may be skipped when the cursor moves
    /// faster than the stream is polled.
    #[must_use]
    pub fn stream(&self) -> impl Stream<Item = BlockNumber> + Send + use<> {
        WatchStream::new(self.tx.subscribe()).filter_map(|head| head)
    }

}

/// Wait until `heads` sees a head it has not marked as seen, or `max_wait` elapses.
///
/// A head written after the caller's last `borrow_and_update` wakes it immediately.
pub(crate) async fn wait_for_head_change(
    heads: &mut watch::Receiver<Option<BlockNumber>>,
    max_wait: Duration,
) {
    let _ = tokio::time::timeout(max_wait, heads.changed()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_only_notifies_on_change() {
        let cursor = HeadCursor::default();
        let mut rx = cursor.subscribe();
        assert_eq!(cursor.head(), None);

        cursor.advance(150);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        cursor.advance(150);
        assert!(!rx.has_changed().unwrap());

        cursor.advance(149);
        assert_eq!(cursor.clone().head(), Some(149));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_wakes_on_new_head() {
        let cursor = HeadCursor::default();
        let mut heads = cursor.subscribe();
        let writer = cursor.clone();
        let started = tokio::time::Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            writer.advance(7);
        });
        wait_for_head_change(&mut heads, Duration::from_secs(3)).await;

        assert_eq!(cursor.head(), Some(7));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn head_written_before_waiting_is_not_missed() {
        let cursor = HeadCursor::default();
        let mut heads = cursor.subscribe();
        assert_eq!(*heads.borrow_and_update(), None);

        // Lands between reading the head and starting to wait.
        cursor.advance(42);
        let started = tokio::time::Instant::now();
        wait_for_head_change(&mut heads, Duration::from_secs(3)).await;

        assert!(started.elapsed() < Duration::from_millis(1));
        assert_eq!(*heads.borrow_and_update(), Some(42));
    }

    #[tokio::test]
    async fn stream_yields_known_heads_only() {
        let cursor = HeadCursor::default();
        let mut heads = Box::pin(cursor.stream());

        cursor.advance(10);
        assert_eq!(heads.next().await, Some(10));
        cursor.advance(12);
        assert_eq!(heads.next().await, Some(12));
    }
}
