//! Bounded per-listener notification queue.
//!
//! A FIFO with a fixed capacity, timed blocking offers for producers and a
//! short-polled dequeue for the single consumer. Capacity is enforced with
//! a semaphore pair: `space` starts with one permit per slot, `filled`
//! starts empty; an offer consumes a space permit and releases a filled
//! permit, a poll does the reverse. Blocked operations observe a shutdown
//! token and report the interruption instead of completing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Outcome of a timed offer.
#[derive(Debug)]
pub(crate) enum Offer<N> {
    /// The notification was enqueued.
    Accepted,
    /// No space appeared within the timeout; the notification is handed
    /// back for retry.
    TimedOut(N),
    /// The shutdown token fired while waiting for space.
    Interrupted(N),
}

/// Outcome of a timed poll.
#[derive(Debug)]
pub(crate) enum Polled<N> {
    /// An element was dequeued.
    Item(N),
    /// The queue stayed empty for the full timeout.
    Empty,
    /// The shutdown token fired while waiting for an element.
    Interrupted,
}

/// Bounded FIFO of notifications; many producers, one consumer.
pub(crate) struct BoundedQueue<N> {
    items: Mutex<VecDeque<N>>,
    space: Semaphore,
    filled: Semaphore,
    capacity: usize,
}

impl<N> BoundedQueue<N> {
    /// Creates a queue holding at most `capacity` notifications.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            space: Semaphore::new(capacity),
            filled: Semaphore::new(0),
            capacity,
        }
    }

    /// Returns the queue capacity.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current queue depth. Advisory under concurrency.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Enqueues without waiting, handing the notification back if the
    /// queue is full. Used to seed a queue before it is published.
    pub(crate) fn try_offer(&self, notification: N) -> Result<(), N> {
        match self.space.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.items.lock().unwrap().push_back(notification);
                self.filled.add_permits(1);
                Ok(())
            }
            Err(_) => Err(notification),
        }
    }

    /// Waits up to `timeout` for space, then enqueues.
    pub(crate) async fn offer(
        &self,
        notification: N,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Offer<N> {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => Offer::Interrupted(notification),

            acquired = tokio::time::timeout(timeout, self.space.acquire()) => match acquired {
                Ok(Ok(permit)) => {
                    permit.forget();
                    self.items.lock().unwrap().push_back(notification);
                    self.filled.add_permits(1);
                    Offer::Accepted
                }
                // The semaphores are never closed.
                Ok(Err(_)) => Offer::Interrupted(notification),
                Err(_) => Offer::TimedOut(notification),
            },
        }
    }

    /// Waits up to `timeout` for an element, then dequeues it.
    pub(crate) async fn poll(
        &self,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Polled<N> {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => Polled::Interrupted,

            acquired = tokio::time::timeout(timeout, self.filled.acquire()) => match acquired {
                Ok(Ok(permit)) => {
                    permit.forget();
                    let item = self.items.lock().unwrap().pop_front();
                    self.space.add_permits(1);
                    match item {
                        Some(notification) => Polled::Item(notification),
                        None => Polled::Empty,
                    }
                }
                Ok(Err(_)) => Polled::Interrupted,
                Err(_) => Polled::Empty,
            },
        }
    }

    /// Removes and returns everything buffered, in order.
    ///
    /// Leaves the semaphore pair out of step with the buffer, so this is
    /// only valid on a queue that was never published to a consumer (a
    /// candidate task that lost the registry insert and is being
    /// discarded).
    pub(crate) fn drain(&self) -> Vec<N> {
        self.items.lock().unwrap().drain(..).collect()
    }
}
