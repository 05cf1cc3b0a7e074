//! notifyq - per-listener serial notification dispatch
//!
//! This library queues notifications on a per-listener basis and delivers
//! them serially to each listener on a shared worker pool. A listener never
//! observes two of its notifications concurrently, and notifications
//! submitted for the same listener arrive in submission order.
//!
//! Queues and worker tasks exist only while a listener has pending
//! notifications: the first submission creates a queue and hands a drain
//! task to the worker pool; later submissions append to the live queue;
//! once the queue drains the task retires and both are discarded.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use notifyq::dispatch::{
//!     DispatcherConfig, FnInvoker, NotificationDispatcher, TokioTaskExecutor,
//! };
//!
//! #[derive(Debug)]
//! struct AuditLog;
//!
//! let executor = Arc::new(TokioTaskExecutor::new());
//! let invoker = Arc::new(FnInvoker::new(|listener: &AuditLog, event: String| {
//!     // ... deliver the event ...
//!     Ok(())
//! }));
//!
//! let dispatcher =
//!     NotificationDispatcher::new(executor, invoker, DispatcherConfig::default())?;
//!
//! let listener = Arc::new(AuditLog);
//! dispatcher.submit_notification(&listener, "created".to_string()).await?;
//! ```

pub mod dispatch;
pub mod logging;

/// Version of the notifyq library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
