//! Registry of live per-listener drain tasks.
//!
//! Maps listener identity to the task currently draining that listener's
//! queue. At most one live task is reachable per listener; insertion is
//! an atomic insert-if-absent and removal is performed by the task itself
//! on its exit path.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use super::key::ListenerKey;
use super::task::NotificationTask;

/// Registry mapping listener identity to the live drain task.
pub(crate) struct TaskRegistry<L, N> {
    tasks: DashMap<ListenerKey<L>, Arc<NotificationTask<L, N>>>,
}

impl<L, N> TaskRegistry<L, N> {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Looks up the live task for a listener, cloning the `Arc` out so no
    /// shard guard outlives the call.
    pub(crate) fn get(&self, key: &ListenerKey<L>) -> Option<Arc<NotificationTask<L, N>>> {
        self.tasks.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Atomically installs `task` for the listener unless a task is
    /// already present, in which case the present one is returned and the
    /// candidate is left untouched.
    pub(crate) fn insert_if_absent(
        &self,
        key: ListenerKey<L>,
        task: Arc<NotificationTask<L, N>>,
    ) -> Option<Arc<NotificationTask<L, N>>> {
        match self.tasks.entry(key) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                entry.insert(task);
                None
            }
        }
    }

    /// Unconditionally unlinks the listener's task. Called by the task
    /// itself on its exit path.
    pub(crate) fn remove(&self, key: &ListenerKey<L>) {
        self.tasks.remove(key);
    }

    /// Unlinks the listener's task only if it is still `task`. Used to
    /// evict a candidate the worker pool refused without touching a
    /// successor that may already have taken its place.
    pub(crate) fn remove_task(&self, key: &ListenerKey<L>, task: &Arc<NotificationTask<L, N>>) {
        self.tasks
            .remove_if(key, |_, current| Arc::ptr_eq(current, task));
    }

    /// Returns the number of live tasks.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl<L: fmt::Debug + Send + Sync + 'static, N: Send + 'static> TaskRegistry<L, N> {
    /// Returns a snapshot of per-listener queue depths.
    ///
    /// Weakly consistent with respect to concurrent submission and
    /// retirement; depths are advisory.
    pub(crate) fn listener_stats(&self) -> Vec<ListenerQueueStats> {
        self.tasks
            .iter()
            .map(|entry| ListenerQueueStats {
                listener: format!("{:?}", entry.key()),
                queue_depth: entry.value().queue_depth(),
            })
            .collect()
    }
}

/// Snapshot of one live listener queue.
#[derive(Debug, Clone)]
pub struct ListenerQueueStats {
    /// The listener's `Debug` rendering.
    pub listener: String,
    /// Queue depth at the moment of the snapshot.
    pub queue_depth: usize,
}
