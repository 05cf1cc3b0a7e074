//! Dispatcher configuration.
//!
//! This module contains the [`DispatcherConfig`] struct and the tuning
//! constants for queue capacity and offer/poll timing.

use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default capacity of each per-listener queue.
pub const DEFAULT_MAX_QUEUE_CAPACITY: usize = 1024;

/// Default dispatcher name used in log lines.
pub const DEFAULT_DISPATCHER_NAME: &str = "notifyq";

/// Caps the number of attempts to offer a notification to a listener queue.
///
/// Each attempt window is [`OFFER_ATTEMPT_TIMEOUT`], so an offer gives up
/// after roughly ten minutes and the notification is dropped.
pub const MAX_OFFER_ATTEMPTS: u32 = 10;

/// How long a single offer attempt waits for queue space.
pub const OFFER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// How long the drain loop waits for an element before considering
/// retirement.
pub const QUEUE_POLL_TIMEOUT: Duration = Duration::from_millis(10);

// =============================================================================
// Dispatcher Configuration
// =============================================================================

/// Configuration for a [`NotificationDispatcher`].
///
/// [`NotificationDispatcher`]: super::NotificationDispatcher
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Human-readable dispatcher name, included in every log line.
    pub name: String,

    /// Capacity of each per-listener queue. Must be greater than zero.
    pub max_queue_capacity: usize,

    /// Shutdown token observed by blocked queue operations.
    ///
    /// Cancelling this token makes producers stop enqueuing and drain
    /// tasks exit and unlink themselves. There is no separate `close()`
    /// on the dispatcher.
    pub shutdown: CancellationToken,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DISPATCHER_NAME.to_string(),
            max_queue_capacity: DEFAULT_MAX_QUEUE_CAPACITY,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Errors raised while validating a [`DispatcherConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The per-listener queue capacity was zero.
    #[error("max_queue_capacity must be greater than zero")]
    InvalidQueueCapacity,
}
