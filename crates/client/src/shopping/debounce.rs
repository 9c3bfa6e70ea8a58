//! Per-key debounce timer registry.
//!
//! Holds at most one pending timer per key: scheduling under a key that
//! already has a timer aborts the previous one, so only the last action
//! within the window runs. `cancel_all` is the teardown path; an aborted
//! timer never runs its body.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Registry of cancellable debounce timers keyed by `K`.
#[derive(Debug, Default)]
pub struct DebounceRegistry<K> {
    timers: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K: Eq + Hash + Clone> DebounceRegistry<K> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule `action` to run after `delay`, superseding any pending timer
    /// for the same key.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });

        if let Ok(mut timers) = self.timers.lock()
            && let Some(previous) = timers.insert(key, handle)
        {
            previous.abort();
        }
    }

    /// Drop the bookkeeping entry for a timer whose body is now running.
    ///
    /// Called by the scheduled action itself; does not abort.
    pub fn complete(&self, key: &K) {
        if let Ok(mut timers) = self.timers.lock() {
            timers.remove(key);
        }
    }

    /// Cancel every pending timer synchronously.
    pub fn cancel_all(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            for (_, handle) in timers.drain() {
                handle.abort();
            }
        }
    }

    /// Number of timers currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.lock().map_or(0, |timers| timers.len())
    }

    /// Whether no timers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_after_delay() {
        let registry = DebounceRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&fired);
        registry.schedule("k", Duration::from_millis(300), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_supersedes_previous_timer() {
        let registry = DebounceRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&fired);
            registry.schedule("k", Duration::from_millis(300), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_prevents_firing() {
        let registry = DebounceRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&fired);
        registry.schedule("k", Duration::from_millis(300), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        registry.cancel_all();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_keys_both_fire() {
        let registry = DebounceRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        for key in ["a", "b"] {
            let counter = Arc::clone(&fired);
            registry.schedule(key, Duration::from_millis(300), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
