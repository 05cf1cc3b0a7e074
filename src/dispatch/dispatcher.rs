//! Dispatcher core - routing submissions to per-listener drain tasks.
//!
//! The dispatcher is the public entry point. Each submission either lands
//! in the live task's queue for that listener, or publishes a fresh task
//! and hands it to the worker pool. Tasks retire themselves once their
//! queue is quiescent, so the registry only ever holds listeners with
//! pending notifications.

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::config::{ConfigError, DispatcherConfig};
use super::key::ListenerKey;
use super::registry::{ListenerQueueStats, TaskRegistry};
use super::task::{NotificationTask, TaskSubmit};
use super::traits::{Invoker, NotificationManager, RejectedError, TaskExecutor};

/// Queues and dispatches notifications for multiple listeners
/// concurrently.
///
/// Notifications are queued per listener and delivered serially to each
/// listener on the worker pool supplied at construction. Listeners are
/// identified by `Arc` pointer identity, never by their own equality.
///
/// Cloning is cheap and clones share all state.
pub struct NotificationDispatcher<L, N> {
    inner: Arc<DispatcherInner<L, N>>,
}

struct DispatcherInner<L, N> {
    executor: Arc<dyn TaskExecutor>,
    invoker: Arc<dyn Invoker<L, N>>,
    registry: Arc<TaskRegistry<L, N>>,
    name: String,
    max_queue_capacity: usize,
    shutdown: CancellationToken,
}

impl<L, N> NotificationDispatcher<L, N>
where
    L: fmt::Debug + Send + Sync + 'static,
    N: Send + 'static,
{
    /// Creates a dispatcher delivering through `invoker` on `executor`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidQueueCapacity`] when the configured
    /// per-listener queue capacity is zero.
    pub fn new(
        executor: Arc<dyn TaskExecutor>,
        invoker: Arc<dyn Invoker<L, N>>,
        config: DispatcherConfig,
    ) -> Result<Self, ConfigError> {
        if config.max_queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                executor,
                invoker,
                registry: Arc::new(TaskRegistry::new()),
                name: config.name,
                max_queue_capacity: config.max_queue_capacity,
                shutdown: config.shutdown,
            }),
        })
    }

    /// Submits one notification for delivery to the listener.
    ///
    /// # Errors
    ///
    /// Returns [`RejectedError`] when a fresh drain task was needed and
    /// the worker pool refused it. All other failures are contained: an
    /// enqueue that exhausts its offer attempts drops that notification
    /// with an error log, and invoker failures never reach the submitter.
    pub async fn submit_notification(
        &self,
        listener: &Arc<L>,
        notification: N,
    ) -> Result<(), RejectedError> {
        self.submit_notifications(listener, [notification]).await
    }

    /// Submits a batch of notifications for in-order delivery to the
    /// listener. An empty batch returns without effect.
    ///
    /// Callers must not submit concurrently for the same listener; the
    /// dispatcher still makes progress in that case but promises no
    /// cross-caller ordering.
    ///
    /// # Errors
    ///
    /// Returns [`RejectedError`] as for [`Self::submit_notification`].
    pub async fn submit_notifications<I>(
        &self,
        listener: &Arc<L>,
        notifications: I,
    ) -> Result<(), RejectedError>
    where
        I: IntoIterator<Item = N>,
    {
        let mut pending: Vec<N> = notifications.into_iter().collect();
        if pending.is_empty() {
            return Ok(());
        }

        let inner = &self.inner;
        let key = ListenerKey::new(Arc::clone(listener));

        trace!(
            dispatcher = %inner.name,
            listener = ?key,
            count = pending.len(),
            "Submitting notifications"
        );

        // Loop until the batch lands in a live task's queue or a fresh
        // task is published holding it. Each pass either succeeds or
        // observes a retiring task whose unlink is already pending, so
        // progress is guaranteed.
        loop {
            if let Some(existing) = inner.registry.get(&key) {
                match existing.submit_notifications(pending).await {
                    TaskSubmit::Queued => return Ok(()),
                    TaskSubmit::Interrupted => {
                        debug!(
                            dispatcher = %inner.name,
                            listener = ?key,
                            "Interrupted adding to the listener queue; treating as shutdown"
                        );
                        return Ok(());
                    }
                    TaskSubmit::Retired(batch) => pending = batch,
                }
            }

            // No live task, or the live one is retiring. Publish a fresh
            // task seeded with whatever fits without waiting.
            let (candidate, leftover) = NotificationTask::new(
                key.clone(),
                pending,
                inner.max_queue_capacity,
                inner.name.clone(),
                inner.shutdown.clone(),
            );

            match inner
                .registry
                .insert_if_absent(key.clone(), Arc::clone(&candidate))
            {
                None => {
                    debug!(
                        dispatcher = %inner.name,
                        listener = ?key,
                        "Submitting notification task to the worker pool"
                    );

                    let run = Arc::clone(&candidate)
                        .run(Arc::clone(&inner.invoker), Arc::clone(&inner.registry));
                    if let Err(rejected) = inner.executor.execute(Box::pin(run)) {
                        // Evict the candidate so the registry drains to
                        // empty and a later submission can try again.
                        inner.registry.remove_task(&key, &candidate);
                        return Err(rejected);
                    }

                    if leftover.is_empty() {
                        return Ok(());
                    }
                    // The oversized remainder goes through timed offers
                    // now that the task is draining.
                    pending = leftover;
                }
                Some(_existing) => {
                    // Lost the publish race. Take the seeded notifications
                    // back in order and retry against the winner.
                    let mut reclaimed = candidate.reclaim();
                    reclaimed.extend(leftover);
                    pending = reclaimed;
                }
            }
        }
    }

    /// Returns a snapshot of the queue depth for each listener with a
    /// live drain task. Weakly consistent; depths are advisory.
    pub fn listener_stats(&self) -> Vec<ListenerQueueStats> {
        self.inner.registry.listener_stats()
    }

    /// Returns the capacity of each per-listener queue.
    #[inline]
    pub fn max_queue_capacity(&self) -> usize {
        self.inner.max_queue_capacity
    }

    /// Returns the worker pool drain tasks run on.
    pub fn executor(&self) -> &Arc<dyn TaskExecutor> {
        &self.inner.executor
    }

    /// Returns the dispatcher name used in log lines.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the shutdown token observed by blocked queue operations.
    ///
    /// Cancelling it is the shutdown mechanism: producers stop enqueuing
    /// and residual drain tasks exit and unlink themselves.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}

impl<L, N> NotificationManager<L, N> for NotificationDispatcher<L, N>
where
    L: fmt::Debug + Send + Sync + 'static,
    N: Send + 'static,
{
    async fn submit_notification(
        &self,
        listener: &Arc<L>,
        notification: N,
    ) -> Result<(), RejectedError> {
        NotificationDispatcher::submit_notification(self, listener, notification).await
    }

    async fn submit_notifications<I>(
        &self,
        listener: &Arc<L>,
        notifications: I,
    ) -> Result<(), RejectedError>
    where
        I: IntoIterator<Item = N> + Send,
        I::IntoIter: Send,
    {
        NotificationDispatcher::submit_notifications(self, listener, notifications).await
    }
}

impl<L, N> Clone for NotificationDispatcher<L, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L, N> fmt::Debug for NotificationDispatcher<L, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("name", &self.inner.name)
            .field("max_queue_capacity", &self.inner.max_queue_capacity)
            .field("live_tasks", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}
