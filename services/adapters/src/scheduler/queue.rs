//! Work queue with explicit completion acknowledgement
//!
//! `get` hands out a [`Ticket`]; the item counts as done only when the
//! ticket is dropped. [`TaskQueue::join`] resolves once every item ever put
//! has been acknowledged, not merely dequeued.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ops::Deref;
use tokio::sync::{watch, Notify};

#[derive(Debug)]
pub struct TaskQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
    unfinished: watch::Sender<usize>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            unfinished,
        }
    }

    pub fn put(&self, item: T) {
        self.unfinished.send_modify(|n| *n += 1);
        self.items.lock().push_back(item);
        self.available.notify_one();
    }

    /// Wait for the next item
    pub async fn get(&self) -> Ticket<'_, T> {
        loop {
            let next = {
                let mut items = self.items.lock();
                let next = items.pop_front();
                if next.is_some() && !items.is_empty() {
                    // Pass the wakeup on so another idle worker picks up the rest
                    self.available.notify_one();
                }
                next
            };
            if let Some(item) = next {
                return Ticket { item, queue: self };
            }
            self.available.notified().await;
        }
    }

    /// Items put but not yet acknowledged
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Resolve once every item has been acknowledged
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // The queue owns the sender, so the channel cannot close while we wait
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn task_done(&self) {
        self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// A dequeued item; acknowledges completion when dropped
#[derive(Debug)]
pub struct Ticket<'a, T> {
    item: T,
    queue: &'a TaskQueue<T>,
}

impl<T> Deref for Ticket<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> Drop for Ticket<'_, T> {
    fn drop(&mut self) {
        self.queue.task_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_join_waits_for_acknowledgement_not_dequeue() {
        let queue = Arc::new(TaskQueue::new());
        queue.put(1);
        queue.put(2);

        let first = queue.get().await;
        let second = queue.get().await;
        assert!(queue.is_empty());
        assert_eq!(queue.unfinished(), 2);

        assert!(timeout(Duration::from_millis(20), queue.join()).await.is_err());
        drop(second);
        assert!(timeout(Duration::from_millis(20), queue.join()).await.is_err());
        drop(first);
        timeout(Duration::from_millis(20), queue.join()).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_waits_for_put() {
        let queue = Arc::new(TaskQueue::new());
        let consumer = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move {
                let item = *queue.get().await;
                item
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.put("late");
        assert_eq!(consumer.await.unwrap(), "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_releases_after_every_out_of_order_ack() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let queue = Arc::new(TaskQueue::new());
        for route in 0..3u64 {
            for date in 0..4u64 {
                queue.put((route, date));
            }
        }
        assert_eq!(queue.unfinished(), 12);

        let done = Arc::new(AtomicUsize::new(0));
        for worker in 0..4u64 {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                loop {
                    let ticket = queue.get().await;
                    let (route, date) = *ticket;
                    // Later items finish first
                    tokio::time::sleep(Duration::from_millis(50 - route * 10 - date + worker)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    drop(ticket);
                }
            });
        }

        queue.join().await;
        assert_eq!(done.load(Ordering::SeqCst), 12);
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_joins_immediately() {
        TaskQueue::<u8>::new().join().await;
    }
}
