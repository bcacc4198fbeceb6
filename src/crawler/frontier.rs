//! Bounded frontier queue shared by the producer and the consumer
//!
//! Entries are canonical page keys. Uniqueness is guaranteed upstream: the
//! registry hands out a key for enqueueing only once, when the page is
//! created.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct FrontierState {
    items: VecDeque<String>,
    closed: bool,
    peak: usize,
}

/// Bounded FIFO of page keys awaiting fetch
///
/// # Suspension
///
/// - [`Frontier::push`] suspends while the queue holds `capacity` entries
/// - [`Frontier::push_discovered`] never suspends and may exceed `capacity`
/// - [`Frontier::pop`] suspends while the queue is empty and still open
///
/// The consumer must use `push_discovered`: it is the only task draining the
/// queue, so waiting on its own full queue would never end.
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl Frontier {
    /// Creates an empty frontier holding at most `capacity` producer entries
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            capacity: capacity.max(1),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a key, waiting for room if the queue is full
    pub async fn push(&self, key: String) {
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.items.len() < self.capacity {
                    state.items.push_back(key);
                    state.peak = state.peak.max(state.items.len());
                    break;
                }
            }

            tracing::trace!("Frontier full ({}), waiting", self.capacity);
            notified.await;
        }

        self.not_empty.notify_one();
    }

    /// Appends a key without waiting, even past capacity
    pub fn push_discovered(&self, key: String) {
        {
            let mut state = self.lock();
            state.items.push_back(key);
            state.peak = state.peak.max(state.items.len());
        }

        self.not_empty.notify_one();
    }

    /// Removes the oldest key, waiting while the queue is empty
    ///
    /// # Returns
    ///
    /// * `Some(String)` - The next key
    /// * `None` - The queue is closed and drained; no key will ever arrive
    pub async fn pop(&self) -> Option<String> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(key) = state.items.pop_front() {
                    drop(state);
                    self.not_full.notify_one();
                    return Some(key);
                }

                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks the end of producer input
    ///
    /// Keys already queued, and keys the consumer discovers later, are still
    /// handed out by [`Frontier::pop`].
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest number of keys queued at once
    pub fn peak(&self) -> usize {
        self.lock().peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new(10);
        frontier.push("/a".to_string()).await;
        frontier.push("/b".to_string()).await;
        frontier.push_discovered("/c".to_string());
        frontier.close();

        assert_eq!(frontier.pop().await.as_deref(), Some("/a"));
        assert_eq!(frontier.pop().await.as_deref(), Some("/b"));
        assert_eq!(frontier.pop().await.as_deref(), Some("/c"));
        assert_eq!(frontier.pop().await, None);
    }

    #[tokio::test]
    async fn test_push_suspends_when_full() {
        let frontier = Arc::new(Frontier::new(1));
        frontier.push("/first".to_string()).await;

        let producer = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.push("/second".to_string()).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished(), "push should wait for room");
        assert_eq!(frontier.len(), 1);

        assert_eq!(frontier.pop().await.as_deref(), Some("/first"));
        tokio::time::timeout(Duration::from_secs(1), producer)
            .await
            .expect("push should resume after a pop")
            .unwrap();

        assert_eq!(frontier.pop().await.as_deref(), Some("/second"));
    }

    #[tokio::test]
    async fn test_push_discovered_ignores_capacity() {
        let frontier = Frontier::new(1);
        frontier.push("/a".to_string()).await;
        frontier.push_discovered("/b".to_string());
        frontier.push_discovered("/c".to_string());

        assert_eq!(frontier.len(), 3);
        assert_eq!(frontier.peak(), 3);
    }

    #[tokio::test]
    async fn test_pop_waits_for_close() {
        let frontier = Arc::new(Frontier::new(4));

        let consumer = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!consumer.is_finished(), "pop should wait on an open empty queue");

        frontier.close();
        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("pop should return after close")
            .unwrap();
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn test_pop_receives_late_push() {
        let frontier = Arc::new(Frontier::new(4));

        let consumer = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.push("/late".to_string()).await;

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.as_deref(), Some("/late"));
    }

    #[test]
    fn test_zero_capacity_is_one() {
        assert_eq!(Frontier::new(0).capacity(), 1);
    }
}
