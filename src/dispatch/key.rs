//! Identity-based registry key for listeners.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::{fmt, ptr};

/// Registry key wrapping one listener reference.
///
/// Equality and hashing derive from the pointer identity of the `Arc`
/// allocation, never from the listener's own `PartialEq`/`Hash`. Listeners
/// come from unrelated client code and cannot be trusted to implement value
/// equality correctly, so two clones of the same `Arc` are the same
/// listener while two separately allocated `Arc`s are always distinct, even
/// if the wrapped values compare equal.
pub struct ListenerKey<L> {
    listener: Arc<L>,
}

impl<L> ListenerKey<L> {
    /// Creates a key for the given listener reference.
    pub fn new(listener: Arc<L>) -> Self {
        Self { listener }
    }

    /// Returns the wrapped listener.
    #[inline]
    pub fn listener(&self) -> &L {
        &self.listener
    }
}

impl<L> Clone for ListenerKey<L> {
    fn clone(&self) -> Self {
        Self {
            listener: Arc::clone(&self.listener),
        }
    }
}

impl<L> PartialEq for ListenerKey<L> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.listener, &other.listener)
    }
}

impl<L> Eq for ListenerKey<L> {}

impl<L> Hash for ListenerKey<L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(Arc::as_ptr(&self.listener), state);
    }
}

impl<L: fmt::Debug> fmt::Debug for ListenerKey<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.listener, f)
    }
}
