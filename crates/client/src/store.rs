//! Subscribable state container.
//!
//! A minimal `getState`/`subscribe`/`setState` store over a watch channel.
//! Every mutation publishes a full-value snapshot; subscribers never observe
//! a partially applied update.

use tokio::sync::watch;

/// A reactive state container.
///
/// Clones share the same underlying state. UI layers subscribe via
/// [`Store::subscribe`] and re-render on change; the engines in this crate
/// are the only writers.
#[derive(Debug, Clone)]
pub struct Store<S> {
    tx: watch::Sender<S>,
}

impl<S: Clone> Store<S> {
    /// Create a store with the given initial state.
    #[must_use]
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn get(&self) -> S {
        self.tx.borrow().clone()
    }

    /// Read a projection of the current state without cloning all of it.
    pub fn with<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.tx.borrow())
    }

    /// Subscribe to state changes.
    ///
    /// The receiver yields the latest snapshot after each mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    /// Replace the state wholesale.
    pub fn replace(&self, next: S) {
        self.tx.send_replace(next);
    }

    /// Apply a mutation and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
    }
}

impl<S: Clone + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
