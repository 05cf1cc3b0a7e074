//! Per-listener drain task.
//!
//! One task owns one listener's queue and drains it serially. Producers
//! append through [`NotificationTask::submit_notifications`]; the worker
//! pool runs [`NotificationTask::run`] exactly once. Retirement is
//! coordinated through two flags guarded by the queuing lock:
//!
//! - `done` rises when the task has decided to retire; producers observing
//!   it must publish a replacement task.
//! - `queued_notifications` is set by a producer after enqueuing and
//!   cleared by the consumer each time it considers retiring. It is what
//!   lets the consumer tell "empty forever" apart from "momentarily empty
//!   with a producer mid-append", so no notification is stranded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::fmt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::config::{MAX_OFFER_ATTEMPTS, OFFER_ATTEMPT_TIMEOUT, QUEUE_POLL_TIMEOUT};
use super::key::ListenerKey;
use super::queue::{BoundedQueue, Offer, Polled};
use super::registry::TaskRegistry;
use super::traits::{InvokeError, Invoker};

/// Outcome of submitting a batch to a live task.
pub(crate) enum TaskSubmit<N> {
    /// The batch was enqueued (possibly minus notifications dropped after
    /// exhausting their offer attempts).
    Queued,
    /// The task has retired; the untouched batch is handed back and the
    /// caller must publish a replacement task.
    Retired(Vec<N>),
    /// The shutdown token fired mid-enqueue. The batch is partially
    /// enqueued; the producer treats this as shutdown and stops.
    Interrupted,
}

/// State guarded by the queuing lock.
struct QueueingState {
    queued_notifications: bool,
}

/// Worker task that queues notifications for one listener and delivers
/// them serially.
pub(crate) struct NotificationTask<L, N> {
    key: ListenerKey<L>,
    queue: BoundedQueue<N>,
    queuing: Mutex<QueueingState>,
    /// Written only from the retire paths; lock-free reads see it as a
    /// monotonically-rising hint, the authoritative read is under the
    /// queuing lock.
    done: AtomicBool,
    dispatcher: String,
    shutdown: CancellationToken,
}

impl<L, N> NotificationTask<L, N>
where
    L: fmt::Debug + Send + Sync + 'static,
    N: Send + 'static,
{
    /// Creates a task for `key`, seeding its queue with as much of
    /// `notifications` as fits without waiting. The remainder is handed
    /// back; once the task is draining it can be appended through
    /// [`Self::submit_notifications`].
    pub(crate) fn new(
        key: ListenerKey<L>,
        notifications: Vec<N>,
        capacity: usize,
        dispatcher: String,
        shutdown: CancellationToken,
    ) -> (Arc<Self>, Vec<N>) {
        let queue = BoundedQueue::new(capacity);
        let mut leftover = Vec::new();

        for notification in notifications {
            if !leftover.is_empty() {
                leftover.push(notification);
                continue;
            }
            if let Err(notification) = queue.try_offer(notification) {
                leftover.push(notification);
            }
        }

        let task = Arc::new(Self {
            key,
            queue,
            queuing: Mutex::new(QueueingState {
                queued_notifications: false,
            }),
            done: AtomicBool::new(false),
            dispatcher,
            shutdown,
        });

        (task, leftover)
    }

    /// Current queue depth, for stats snapshots.
    #[inline]
    pub(crate) fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    /// Takes back everything seeded into the queue, in order.
    ///
    /// Only valid on a task that lost the registry insert and was never
    /// published to the worker pool.
    pub(crate) fn reclaim(&self) -> Vec<N> {
        self.queue.drain()
    }

    /// Appends a batch to the queue, serialized against the drain loop's
    /// retirement decision.
    ///
    /// Each notification is offered for up to [`OFFER_ATTEMPT_TIMEOUT`]
    /// per attempt, [`MAX_OFFER_ATTEMPTS`] times; a notification whose
    /// attempts are exhausted is dropped and delivery continues with the
    /// next one.
    pub(crate) async fn submit_notifications(&self, batch: Vec<N>) -> TaskSubmit<N> {
        let mut state = self.queuing.lock().await;

        // Once done is set the drain loop is exiting; hand the batch back
        // so the caller publishes a replacement task.
        if self.done.load(Ordering::Acquire) {
            return TaskSubmit::Retired(batch);
        }

        for notification in batch {
            match self.offer_with_retries(notification).await {
                OfferOutcome::Accepted | OfferOutcome::Dropped => {}
                OfferOutcome::Interrupted => return TaskSubmit::Interrupted,
            }
        }

        // Tell the drain loop work was just queued so it does not retire
        // on a poll that raced this append.
        state.queued_notifications = true;

        TaskSubmit::Queued
    }

    async fn offer_with_retries(&self, notification: N) -> OfferOutcome {
        let mut notification = notification;

        for attempt in 1..=MAX_OFFER_ATTEMPTS {
            debug!(
                dispatcher = %self.dispatcher,
                listener = ?self.key,
                attempt,
                "Offering notification to the listener queue"
            );

            match self
                .queue
                .offer(notification, OFFER_ATTEMPT_TIMEOUT, &self.shutdown)
                .await
            {
                Offer::Accepted => return OfferOutcome::Accepted,
                Offer::TimedOut(handed_back) => {
                    warn!(
                        dispatcher = %self.dispatcher,
                        listener = ?self.key,
                        attempt,
                        max_attempts = MAX_OFFER_ATTEMPTS,
                        capacity = self.queue.capacity(),
                        "Timed out offering a notification; the queue has reached capacity"
                    );
                    notification = handed_back;
                }
                Offer::Interrupted(_) => {
                    debug!(
                        dispatcher = %self.dispatcher,
                        listener = ?self.key,
                        "Interrupted offering to the listener queue"
                    );
                    return OfferOutcome::Interrupted;
                }
            }
        }

        error!(
            dispatcher = %self.dispatcher,
            listener = ?self.key,
            attempts = MAX_OFFER_ATTEMPTS,
            "Dropping a notification after exhausting all offer attempts; \
             the listener is likely deadlocked or stuck in a loop"
        );
        OfferOutcome::Dropped
    }

    /// Drains the queue serially, called exactly once by the worker pool.
    ///
    /// Exits when the queue is quiescent (empty with no producer
    /// mid-append), on shutdown, or on a fatal invoker error; in every
    /// case the task unlinks itself from the registry before returning.
    pub(crate) async fn run(
        self: Arc<Self>,
        invoker: Arc<dyn Invoker<L, N>>,
        registry: Arc<TaskRegistry<L, N>>,
    ) -> Result<(), InvokeError> {
        let result = self.drain(invoker.as_ref()).await;
        registry.remove(&self.key);
        result
    }

    async fn drain(&self, invoker: &dyn Invoker<L, N>) -> Result<(), InvokeError> {
        loop {
            match self.queue.poll(QUEUE_POLL_TIMEOUT, &self.shutdown).await {
                Polled::Item(notification) => {
                    self.notify_listener(invoker, notification).await?;
                }
                Polled::Empty => {
                    // A held queuing lock means a producer is mid-append;
                    // skip the retirement check and poll again.
                    let Ok(mut state) = self.queuing.try_lock() else {
                        continue;
                    };

                    if !state.queued_notifications {
                        // Nothing was queued since the last check; commit
                        // to retiring. Producers now get Retired and will
                        // publish a successor once we unlink.
                        self.done.store(true, Ordering::Release);
                        return Ok(());
                    }

                    // Work arrived between polls; clear the flag so an
                    // empty poll next time around can retire.
                    state.queued_notifications = false;
                }
                Polled::Interrupted => {
                    debug!(
                        dispatcher = %self.dispatcher,
                        listener = ?self.key,
                        "Interrupted polling the listener queue; shutting down"
                    );
                    return Ok(());
                }
            }
        }
    }

    async fn notify_listener(
        &self,
        invoker: &dyn Invoker<L, N>,
        notification: N,
    ) -> Result<(), InvokeError> {
        debug!(
            dispatcher = %self.dispatcher,
            listener = ?self.key,
            "Invoking listener"
        );

        match invoker.invoke(self.key.listener(), notification).await {
            Ok(()) => Ok(()),
            Err(err) if !err.fatal => {
                error!(
                    dispatcher = %self.dispatcher,
                    listener = ?self.key,
                    error = %err,
                    "Error notifying listener"
                );
                Ok(())
            }
            Err(err) => {
                // Raise done before unwinding so no more notifications are
                // appended to a dying queue. The lock is skipped here: a
                // producer may hold it for minutes in offer retries, and
                // done only ever rises.
                self.done.store(true, Ordering::Release);
                Err(err)
            }
        }
    }
}

impl<L: fmt::Debug, N> fmt::Debug for NotificationTask<L, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationTask")
            .field("listener", &self.key)
            .field("queue_depth", &self.queue.len())
            .field("done", &self.is_retired())
            .finish_non_exhaustive()
    }
}

impl<L, N> NotificationTask<L, N> {
    /// Returns true once the task has decided to retire. Rising hint; the
    /// authoritative read happens under the queuing lock.
    #[inline]
    pub(crate) fn is_retired(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

enum OfferOutcome {
    Accepted,
    Dropped,
    Interrupted,
}
