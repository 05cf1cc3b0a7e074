//! Per-Listener Serial Notification Dispatch
//!
//! This module queues notifications per listener and delivers them
//! serially to each listener on a shared worker pool.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  NotificationDispatcher                      │
//! │  Route submissions to the live task or publish a fresh one  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      TaskRegistry                            │
//! │  Listener identity → live NotificationTask (insert-if-      │
//! │  absent on publish, self-removal on retirement)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐   ┌──────────────────┐                │
//! │  │ NotificationTask │──▶│   BoundedQueue   │  one pair per  │
//! │  │ serial drain loop│   │ timed offer/poll │  live listener │
//! │  └──────────────────┘   └──────────────────┘                │
//! └─────────────────────────────────────────────────────────────┘
//!          │ runs on                     │ delivers via
//!          ▼                             ▼
//!    TaskExecutor (worker pool)    Invoker (caller-supplied)
//! ```
//!
//! # Core Concepts
//!
//! - **Listener identity**: listeners are keyed by `Arc` pointer
//!   identity. Client equality implementations are never trusted.
//!
//! - **Lazy tasks**: a queue and drain task exist only while a listener
//!   has pending notifications. The task retires itself once its queue is
//!   quiescent; a two-flag handshake under the queuing lock makes the
//!   retirement decision safe against a producer appending concurrently.
//!
//! - **Backpressure**: per-listener queues are bounded. A producer blocks
//!   in timed offer attempts when a queue is full and eventually drops a
//!   notification an unresponsive listener cannot absorb, logging the
//!   listener so operators can find it.
//!
//! - **Failure isolation**: a recoverable invoker error affects only the
//!   notification being delivered. A fatal error retires that listener's
//!   task; other listeners are untouched. Only a worker-pool rejection
//!   reaches the submitting caller.

mod config;
mod dispatcher;
mod key;
mod queue;
mod registry;
mod task;
mod traits;

// Dispatcher
pub use dispatcher::NotificationDispatcher;

// Configuration
pub use config::{
    ConfigError, DispatcherConfig, DEFAULT_DISPATCHER_NAME, DEFAULT_MAX_QUEUE_CAPACITY,
    MAX_OFFER_ATTEMPTS, OFFER_ATTEMPT_TIMEOUT, QUEUE_POLL_TIMEOUT,
};

// Listener identity
pub use key::ListenerKey;

// Stats snapshot
pub use registry::ListenerQueueStats;

// Seams (worker pool, delivery, submission contract)
pub use traits::{
    FnInvoker, InvokeError, Invoker, NotificationManager, RejectedError, TaskExecutor, TaskFuture,
    TokioTaskExecutor,
};
