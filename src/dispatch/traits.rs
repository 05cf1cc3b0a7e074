//! Seam traits between the dispatcher and its collaborators.
//!
//! The dispatcher owns routing, queuing and the per-listener drain loop;
//! everything else is injected through the traits here:
//!
//! - [`Invoker`] - performs the actual delivery of one notification to one
//!   listener.
//! - [`TaskExecutor`] - the shared worker pool that runs drain tasks.
//! - [`NotificationManager`] - the submission contract implemented by the
//!   dispatcher itself, for callers that only need to submit.

use futures::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::Handle;

// ============================================================================
// Notification Manager Trait
// ============================================================================

/// Submission contract for queued notification delivery.
///
/// Implemented by [`NotificationDispatcher`]; accept this trait where only
/// the submission side is needed.
///
/// [`NotificationDispatcher`]: super::NotificationDispatcher
pub trait NotificationManager<L, N>: Send + Sync {
    /// Submits one notification for delivery to the listener.
    fn submit_notification(
        &self,
        listener: &Arc<L>,
        notification: N,
    ) -> impl Future<Output = Result<(), RejectedError>> + Send;

    /// Submits a batch of notifications for in-order delivery to the
    /// listener.
    fn submit_notifications<I>(
        &self,
        listener: &Arc<L>,
        notifications: I,
    ) -> impl Future<Output = Result<(), RejectedError>> + Send
    where
        I: IntoIterator<Item = N> + Send,
        I::IntoIter: Send;
}

// ============================================================================
// Invoker Trait
// ============================================================================

/// Performs the delivery of a single notification to a single listener.
///
/// The dispatcher calls this serially per listener: `invoke` is never
/// running twice concurrently for the same listener. A recoverable error
/// is logged and the next notification proceeds; a fatal error retires the
/// listener's drain task.
pub trait Invoker<L, N>: Send + Sync {
    /// Delivers one notification to the listener.
    fn invoke<'a>(
        &'a self,
        listener: &'a L,
        notification: N,
    ) -> Pin<Box<dyn Future<Output = Result<(), InvokeError>> + Send + 'a>>;
}

/// Errors from listener invocation.
#[derive(Debug, Clone)]
pub struct InvokeError {
    /// Human-readable error message.
    pub message: String,
    /// Whether the failure is fatal (retires the drain task) or
    /// recoverable (delivery continues with the next notification).
    pub fatal: bool,
}

impl InvokeError {
    /// Creates a recoverable error; the listener keeps receiving
    /// subsequent notifications.
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    /// Creates a fatal error; the listener's drain task retires and the
    /// error surfaces through the worker pool's failure channel.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

impl std::fmt::Display for InvokeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InvokeError {}

// ============================================================================
// Closure Invoker
// ============================================================================

/// Adapts a synchronous closure to the [`Invoker`] trait.
///
/// Useful for invokers that complete without awaiting, recording
/// test invokers included.
pub struct FnInvoker<F> {
    func: F,
}

impl<F> FnInvoker<F> {
    /// Wraps the given closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<L, N, F> Invoker<L, N> for FnInvoker<F>
where
    F: Fn(&L, N) -> Result<(), InvokeError> + Send + Sync,
{
    fn invoke<'a>(
        &'a self,
        listener: &'a L,
        notification: N,
    ) -> Pin<Box<dyn Future<Output = Result<(), InvokeError>> + Send + 'a>> {
        Box::pin(std::future::ready((self.func)(listener, notification)))
    }
}

// ============================================================================
// Task Executor Trait
// ============================================================================

/// A per-listener drain task, ready to hand to the worker pool.
///
/// The `Err` output carries a fatal invoker failure out through the pool's
/// own failure channel (a `JoinHandle` under tokio); the task has already
/// unlinked itself before the future resolves.
pub type TaskFuture = BoxFuture<'static, Result<(), InvokeError>>;

/// Errors from a worker pool refusing a drain task.
#[derive(Debug, Clone)]
pub struct RejectedError {
    /// Human-readable error message.
    pub message: String,
}

impl RejectedError {
    /// Creates a new rejection error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RejectedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RejectedError {}

/// The shared worker pool that runs per-listener drain tasks.
///
/// `execute` either accepts the task for eventual execution or refuses it;
/// a refusal is the only dispatcher failure that reaches submitting
/// callers. The pool is expected to provide at least one worker per
/// concurrently draining listener, otherwise tasks may starve.
pub trait TaskExecutor: Send + Sync {
    /// Hands a drain task to the pool.
    fn execute(&self, task: TaskFuture) -> Result<(), RejectedError>;
}

// ============================================================================
// Tokio Executor Implementation
// ============================================================================

/// Tokio-based [`TaskExecutor`] that spawns each drain task on a runtime
/// handle. Never refuses a task.
#[derive(Clone)]
pub struct TokioTaskExecutor {
    handle: Handle,
}

impl TokioTaskExecutor {
    /// Creates an executor on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Creates an executor on the given runtime handle.
    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl TaskExecutor for TokioTaskExecutor {
    fn execute(&self, task: TaskFuture) -> Result<(), RejectedError> {
        self.handle.spawn(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_error_recoverable() {
        let err = InvokeError::recoverable("listener hiccup");
        assert!(!err.fatal);
        assert_eq!(err.message, "listener hiccup");
        assert_eq!(format!("{}", err), "listener hiccup");
    }

    #[test]
    fn test_invoke_error_fatal() {
        let err = InvokeError::fatal("listener state corrupt");
        assert!(err.fatal);
    }

    #[tokio::test]
    async fn test_fn_invoker_delegates_to_closure() {
        let invoker = FnInvoker::new(|listener: &&str, n: u32| {
            assert_eq!(*listener, "the-listener");
            if n == 0 {
                Err(InvokeError::recoverable("zero"))
            } else {
                Ok(())
            }
        });

        let listener = "the-listener";
        assert!(invoker.invoke(&listener, 7).await.is_ok());
        assert!(invoker.invoke(&listener, 0).await.is_err());
    }

    #[test]
    fn test_rejected_error_display() {
        let err = RejectedError::new("pool saturated");
        assert_eq!(format!("{}", err), "pool saturated");
    }

    #[tokio::test]
    async fn test_tokio_task_executor_runs_task() {
        let executor = TokioTaskExecutor::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        let accepted = executor.execute(Box::pin(async move {
            let _ = tx.send(42);
            Ok(())
        }));

        assert!(accepted.is_ok());
        assert_eq!(rx.await.unwrap(), 42);
    }
}
