//! Observable holder for the current `AuthState`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use log::*;
use tokio::sync::watch;

use crate::state::{AuthState, Event};

/// Receives every state change, synchronously, on the writer's thread.
///
/// Observers must not trigger new writes from inside `on_state_changed`;
/// such writes are rejected. Writes from other threads wait for the
/// notification to finish.
pub trait Observer: Send + Sync {
    fn on_state_changed(&self, state: &AuthState);
}

impl<F> Observer for F
where
    F: Fn(&AuthState) + Send + Sync,
{
    fn on_state_changed(&self, state: &AuthState) {
        self(state)
    }
}

/// Handle returned by `Store::subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The state before and after applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub previous: AuthState,
    pub current: AuthState,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Single-writer store for the sign-in screen's state.
///
/// Reads and subscriptions are public. Writes go through `apply`, which is only
/// visible inside this crate so the coordinator stays the sole writer.
pub struct Store {
    state: RwLock<AuthState>,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn Observer>)>>,
    next_subscription: AtomicU64,
    // Held from the state write until every observer has been called.
    writer: Mutex<()>,
    notifying_thread: Mutex<Option<ThreadId>>,
    watch_tx: watch::Sender<AuthState>,
}

impl Store {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(AuthState::default());
        Self {
            state: RwLock::new(AuthState::default()),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            writer: Mutex::new(()),
            notifying_thread: Mutex::new(None),
            watch_tx,
        }
    }

    /// A copy of the current state.
    pub fn current(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register an observer. It is not called for the current state, only for later changes.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        debug!("Registered state observer {:?}", id);
        id
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    /// A receiver that always holds the latest state, for async consumers.
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.watch_tx.subscribe()
    }

    /// Apply `event` and notify observers if the state changed.
    ///
    /// Writes are serialized. A write made by an observer while it is being
    /// notified is rejected and leaves the state as is.
    pub(crate) fn apply(&self, event: &Event) -> Transition {
        self.apply_if(event, || true)
            .unwrap_or_else(|| self.unchanged())
    }

    /// Like `apply`, but only if `guard` still holds once this writer has the
    /// store to itself. Returns `None` when the guard declines.
    pub(crate) fn apply_if(
        &self,
        event: &Event,
        guard: impl FnOnce() -> bool,
    ) -> Option<Transition> {
        let this_thread = thread::current().id();
        if *self
            .notifying_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == Some(this_thread)
        {
            warn!("Rejected re-entrant state write for {:?}", event);
            return Some(self.unchanged());
        }

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard() {
            return None;
        }

        let transition = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let previous = state.clone();
            let current = previous.next(event);
            *state = current.clone();
            Transition { previous, current }
        };

        if transition.changed() {
            debug!(
                "Auth state {} -> {}",
                transition.previous.name(),
                transition.current.name()
            );
            self.watch_tx.send_replace(transition.current.clone());
            self.notify(&transition.current, this_thread);
        }

        Some(transition)
    }

    fn unchanged(&self) -> Transition {
        let current = self.current();
        Transition {
            previous: current.clone(),
            current,
        }
    }

    fn notify(&self, state: &AuthState, this_thread: ThreadId) {
        // Snapshot so observers can subscribe or unsubscribe while being called.
        let observers: Vec<Arc<dyn Observer>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        let _guard = NotifyingGuard::enter(&self.notifying_thread, this_thread);
        for observer in observers {
            observer.on_state_changed(state);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the notifying thread even if an observer panics.
struct NotifyingGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> NotifyingGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread);
        Self(slot)
    }
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
