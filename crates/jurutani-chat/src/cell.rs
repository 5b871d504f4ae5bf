//! Observable state cells.
//!
//! A [`StateCell`] is a value with subscribe-on-change semantics over a
//! tokio watch channel: mutations are visible to subscribers synchronously,
//! and any number of observers can watch one cell.  Clones share the same
//! slot.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Clone)]
pub struct StateCell<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> StateCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(initial)),
        }
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate the value in place under the cell's lock and notify
    /// subscribers.  The closure's return value is passed through.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut out = None;
        self.tx.send_modify(|value| out = Some(f(value)));
        out.expect("update closure always runs")
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Watch for changes.  The receiver also reads the current value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone> StateCell<T> {
    /// Clone out the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
