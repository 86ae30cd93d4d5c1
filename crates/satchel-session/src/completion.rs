//! One-shot completion hook.
//!
//! A [`CompletionHook`] wraps the write-back that must run once the
//! handler is done with the session. [`CompletionHook::fire`] consumes the
//! hook, so a second firing does not type-check. A hook dropped without
//! firing (the request was cancelled) runs nothing.

use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

type Callback<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

/// Callback that runs exactly once, when the response is complete.
pub struct CompletionHook<T> {
    callback: Callback<T>,
    guard: ArmedGuard,
}

impl<T> std::fmt::Debug for CompletionHook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHook")
            .field("label", &self.guard.label)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> CompletionHook<T> {
    /// Register `callback`. `label` identifies the hook in logs.
    pub fn new<F, Fut>(label: impl Into<String>, callback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            callback: Box::new(move || callback().boxed()),
            guard: ArmedGuard {
                label: label.into(),
                armed: true,
            },
        }
    }

    /// Run the callback.
    pub async fn fire(self) -> T {
        let CompletionHook {
            callback,
            mut guard,
        } = self;
        guard.armed = false;
        callback().await
    }
}

struct ArmedGuard {
    label: String,
    armed: bool,
}

impl Drop for ArmedGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(hook = %self.label, "Completion hook dropped before firing, nothing persisted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fire_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hook = CompletionHook::new("test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst) + 1
        });

        assert_eq!(hook.fire().await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_without_fire_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hook = CompletionHook::new("test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(hook);
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_may_await() {
        let hook = CompletionHook::new("sleepy", || async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            "done"
        });
        assert_eq!(hook.fire().await, "done");
    }
}
