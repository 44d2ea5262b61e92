use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;

pub(super) const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Collapses a rapid sequence of score writes for one player into a single
/// deferred write.
///
/// At most one task is pending per key at any time. Scheduling while a task
/// is pending aborts the older task before it fires, so only the newest
/// values ever reach the store. Pending tasks are dropped, not flushed,
/// when the debounce is torn down.
#[derive(Debug)]
pub(super) struct ScoreDebounce {
    window: Duration,
    pending: HashMap<String, AbortHandle>,
}

impl ScoreDebounce {
    pub(super) fn new(window: Duration) -> Self {
        ScoreDebounce {
            window,
            pending: HashMap::new(),
        }
    }

    pub(super) fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Abort the pending task for this key, if any.
    pub(super) fn cancel(&mut self, key: &str) {
        if let Some(pending) = self.pending.remove(key) {
            pending.abort();
        }
    }

    /// Replace any pending task for this key with a new one that runs the
    /// deferred write once the quiet window elapses.
    pub(super) fn schedule<F>(&mut self, key: &str, deferred: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel(key);

        let window = self.window;
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            deferred.await;
        });

        self.pending.insert(String::from(key), task.abort_handle());
    }

    pub(super) fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.abort();
        }
    }
}

impl Drop for ScoreDebounce {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_newer_schedule_replaces_pending_task() {
        let mut debounce = ScoreDebounce::new(Duration::from_millis(20));
        let fired = Arc::new(AtomicU32::new(0));

        for value in [1, 2, 3] {
            let fired = fired.clone();
            debounce.schedule("bob", async move {
                fired.store(value, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(100)).await;

        // only the last scheduled write fired
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_keys_are_debounced_independently() {
        let mut debounce = ScoreDebounce::new(Duration::from_millis(20));
        let fired = Arc::new(AtomicU32::new(0));

        for key in ["bob", "cara"] {
            let fired = fired.clone();
            debounce.schedule(key, async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_task() {
        let mut debounce = ScoreDebounce::new(Duration::from_millis(20));
        let fired = Arc::new(AtomicU32::new(0));

        {
            let fired = fired.clone();
            debounce.schedule("bob", async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        debounce.cancel("bob");

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_teardown_drops_pending_tasks() {
        let fired = Arc::new(AtomicU32::new(0));

        {
            let mut debounce = ScoreDebounce::new(Duration::from_millis(20));
            let fired = fired.clone();
            debounce.schedule("bob", async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
